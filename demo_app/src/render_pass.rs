//! Swapchain render pass, framebuffers and the per-frame command buffer

use ash::vk;
use vulkan_learn::{VulkanContext, VulkanError, VulkanResult};

/// Single-subpass render pass that clears and presents a swapchain image
pub struct SwapchainPass {
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
}

impl SwapchainPass {
    /// Create the pass and one framebuffer per swapbuffer sized to `rect`
    pub fn new(ctx: &VulkanContext, rect: vk::Rect2D) -> VulkanResult<Self> {
        let attachments = [vk::AttachmentDescription::builder()
            .format(ctx.swapchain_format()?)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build()];
        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];
        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build()];

        let render_pass = ctx.create_render_pass(
            &vk::RenderPassCreateInfo::builder()
                .attachments(&attachments)
                .subpasses(&subpasses),
        )?;

        let mut pass = Self {
            render_pass,
            framebuffers: Vec::new(),
        };
        for index in 0..ctx.swapbuffer_count()? {
            let views = [ctx.swapbuffer_view(index)?];
            let framebuffer = ctx.create_framebuffer(
                &vk::FramebufferCreateInfo::builder()
                    .render_pass(render_pass)
                    .attachments(&views)
                    .width(rect.extent.width)
                    .height(rect.extent.height)
                    .layers(1),
            );
            match framebuffer {
                Ok(framebuffer) => pass.framebuffers.push(framebuffer),
                Err(e) => {
                    pass.destroy(ctx);
                    return Err(e);
                }
            }
        }

        log::debug!("Created render pass with {} framebuffers", pass.framebuffers.len());
        Ok(pass)
    }

    /// Render pass handle
    pub fn handle(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Begin the pass on the framebuffer of `swapbuffer`, clearing to `clear_color`
    pub fn begin(
        &self,
        device: &ash::Device,
        command_buffer: vk::CommandBuffer,
        swapbuffer: u32,
        rect: vk::Rect2D,
        clear_color: [f32; 4],
    ) -> VulkanResult<()> {
        let framebuffer = framebuffer_for(&self.framebuffers, swapbuffer)?;
        let clear = [vk::ClearValue {
            color: vk::ClearColorValue { float32: clear_color },
        }];
        let begin_info = vk::RenderPassBeginInfo::builder()
            .render_pass(self.render_pass)
            .framebuffer(framebuffer)
            .render_area(rect)
            .clear_values(&clear);

        unsafe {
            device.cmd_begin_render_pass(command_buffer, &begin_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    /// Destroy the framebuffers and the render pass
    pub fn destroy(&mut self, ctx: &VulkanContext) {
        let Ok(device) = ctx.device() else { return };
        unsafe {
            for framebuffer in self.framebuffers.drain(..) {
                device.destroy_framebuffer(framebuffer, None);
            }
            if self.render_pass != vk::RenderPass::null() {
                device.destroy_render_pass(self.render_pass, None);
                self.render_pass = vk::RenderPass::null();
            }
        }
    }
}

fn framebuffer_for(
    framebuffers: &[vk::Framebuffer],
    swapbuffer: u32,
) -> VulkanResult<vk::Framebuffer> {
    framebuffers.get(swapbuffer as usize).copied().ok_or_else(|| {
        VulkanError::InvalidState(format!(
            "No framebuffer for swapbuffer {swapbuffer} ({} created)",
            framebuffers.len()
        ))
    })
}

/// Command pool with one resettable command buffer, re-recorded every frame
pub struct FrameCommands {
    pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
}

impl FrameCommands {
    /// Create the pool and allocate its command buffer
    pub fn new(ctx: &VulkanContext) -> VulkanResult<Self> {
        let pool = ctx.create_command_pool(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)?;
        let command_buffer = match ctx.create_command_buffer(pool) {
            Ok(cb) => cb,
            Err(e) => {
                unsafe { ctx.device()?.destroy_command_pool(pool, None) };
                return Err(e);
            }
        };
        Ok(Self { pool, command_buffer })
    }

    /// Pool the frame command buffer came from, also usable for uploads
    pub fn pool(&self) -> vk::CommandPool {
        self.pool
    }

    /// Reset the command buffer, record it with `record` and submit it
    ///
    /// Returns once the GPU has finished executing the commands. A failing
    /// `record` still ends the command buffer but skips the submit.
    pub fn record_and_submit<F>(&self, ctx: &VulkanContext, record: F) -> VulkanResult<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer) -> VulkanResult<()>,
    {
        let device = ctx.device()?;
        unsafe {
            device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(VulkanError::Api)?;
            device
                .begin_command_buffer(self.command_buffer, &vk::CommandBufferBeginInfo::builder())
                .map_err(VulkanError::Api)?;
        }
        let recorded = record(device, self.command_buffer);
        let ended =
            unsafe { device.end_command_buffer(self.command_buffer) }.map_err(VulkanError::Api);
        recorded?;
        ended?;
        ctx.submit(self.command_buffer)
    }

    /// Destroy the pool, freeing its command buffer
    pub fn destroy(&mut self, ctx: &VulkanContext) {
        let Ok(device) = ctx.device() else { return };
        if self.pool != vk::CommandPool::null() {
            unsafe { device.destroy_command_pool(self.pool, None) };
            self.pool = vk::CommandPool::null();
            self.command_buffer = vk::CommandBuffer::null();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    fn framebuffers(count: u64) -> Vec<vk::Framebuffer> {
        (1..=count).map(vk::Framebuffer::from_raw).collect()
    }

    #[test]
    fn test_framebuffer_for_acquired_swapbuffer() {
        let fbs = framebuffers(2);
        assert_eq!(framebuffer_for(&fbs, 0).unwrap(), fbs[0]);
        assert_eq!(framebuffer_for(&fbs, 1).unwrap(), fbs[1]);
    }

    #[test]
    fn test_missing_framebuffer_is_invalid_state() {
        let fbs = framebuffers(2);
        match framebuffer_for(&fbs, 2) {
            Err(VulkanError::InvalidState(msg)) => assert!(msg.contains("swapbuffer 2")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
        assert!(matches!(framebuffer_for(&[], 0), Err(VulkanError::InvalidState(_))));
    }
}
