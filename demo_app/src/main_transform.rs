//! Transform: the colored quad spinning in perspective
//!
//! The world-view-projection matrix is rebuilt every update and handed to
//! the vertex shader as a push constant.

use ash::vk;
use demo_app::pipeline::{destroy_pipeline, push_constant_range};
use demo_app::{
    aspect_ratio, load_shaders, orbit_wvp, upload_buffer, FrameCommands, PipelineDesc, ShaderPair,
    SwapchainPass,
};
use vulkan_learn::prelude::*;

struct GpuObjects {
    commands: FrameCommands,
    pass: SwapchainPass,
    shaders: ShaderPair,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    vertex_buffer: BufferResource,
    index_buffer: BufferResource,
    index_count: u32,
}

#[derive(Default)]
struct TransformLesson {
    gpu: Option<GpuObjects>,
    aspect: f32,
    time: f32,
    wvp: [f32; 16],
}

impl App for TransformLesson {
    fn setup(&mut self, ctx: &mut VulkanContext, client_rect: vk::Rect2D) -> AppResult<()> {
        self.aspect = aspect_ratio(client_rect);
        let commands = FrameCommands::new(ctx)?;

        let plane = shape_gen::make_color_plane(0.5);
        let vertex_buffer = upload_buffer(
            ctx,
            commands.pool(),
            &plane.vertices,
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;
        let index_buffer = upload_buffer(
            ctx,
            commands.pool(),
            &plane.indices,
            vk::BufferUsageFlags::INDEX_BUFFER,
        )?;

        let pass = SwapchainPass::new(ctx, client_rect)?;
        let shaders = load_shaders(ctx, "transform")?;
        let ranges = [push_constant_range::<[f32; 16]>(vk::ShaderStageFlags::VERTEX)];
        let (layout, pipeline) = PipelineDesc::with_vertices::<VertexPosCol>()
            .push_constants(&ranges)
            .build(ctx, pass.handle(), &shaders, client_rect)?;

        self.gpu = Some(GpuObjects {
            commands,
            pass,
            shaders,
            layout,
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count: plane.index_count(),
        });
        Ok(())
    }

    fn update(&mut self, _ctx: &mut VulkanContext, delta_time: f64) -> AppResult<()> {
        self.wvp = orbit_wvp(self.time, self.aspect).to_cols_array();
        self.time += delta_time as f32;
        Ok(())
    }

    fn render(&mut self, ctx: &mut VulkanContext, frame: &Frame) -> AppResult<()> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("render before setup".to_string()))?;
        let wvp = self.wvp;

        gpu.commands.record_and_submit(ctx, |device, cmd| unsafe {
            gpu.pass.begin(device, cmd, frame.swapbuffer, frame.client_rect, [0.0; 4])?;
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, gpu.pipeline);
            device.cmd_bind_vertex_buffers(cmd, 0, &[gpu.vertex_buffer.buffer()], &[0]);
            device.cmd_bind_index_buffer(cmd, gpu.index_buffer.buffer(), 0, demo_app::INDEX_TYPE);
            device.cmd_push_constants(
                cmd,
                gpu.layout,
                vk::ShaderStageFlags::VERTEX,
                0,
                bytemuck::cast_slice(&wvp),
            );
            device.cmd_draw_indexed(cmd, gpu.index_count, 1, 0, 0, 0);
            device.cmd_end_render_pass(cmd);
            Ok(())
        })?;
        Ok(())
    }

    fn teardown(&mut self, ctx: &mut VulkanContext) {
        if let Some(mut gpu) = self.gpu.take() {
            destroy_pipeline(ctx, gpu.layout, gpu.pipeline);
            gpu.shaders.destroy(ctx);
            gpu.pass.destroy(ctx);
            gpu.commands.destroy(ctx);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    vulkan_learn::foundation::logging::init();
    run_app(
        ApplicationConfig::new("vulkan-learn", 640, 480),
        TransformLesson::default(),
    )?;
    Ok(())
}
