//! Index buffer: a colored quad drawn from four vertices and six indices
//!
//! Vertex and index data are copied through a staging buffer into
//! device-local memory once, during setup.

use ash::vk;
use demo_app::pipeline::destroy_pipeline;
use demo_app::{load_shaders, upload_buffer, FrameCommands, PipelineDesc, ShaderPair, SwapchainPass};
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
struct IndexBufferLesson {
    gpu: Option<GpuObjects>,
}

impl App for IndexBufferLesson {
    fn setup(&mut self, ctx: &mut VulkanContext, client_rect: vk::Rect2D) -> AppResult<()> {
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
        let shaders = load_shaders(ctx, "index_buffer")?;
        let (layout, pipeline) = PipelineDesc::with_vertices::<VertexPosCol>()
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

    fn update(&mut self, _ctx: &mut VulkanContext, _delta_time: f64) -> AppResult<()> {
        Ok(())
    }

    fn render(&mut self, ctx: &mut VulkanContext, frame: &Frame) -> AppResult<()> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("render before setup".to_string()))?;

        gpu.commands.record_and_submit(ctx, |device, cmd| unsafe {
            gpu.pass.begin(device, cmd, frame.swapbuffer, frame.client_rect, [0.0; 4])?;
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, gpu.pipeline);
            device.cmd_bind_vertex_buffers(cmd, 0, &[gpu.vertex_buffer.buffer()], &[0]);
            device.cmd_bind_index_buffer(cmd, gpu.index_buffer.buffer(), 0, demo_app::INDEX_TYPE);
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
            // Buffers are released when `gpu` drops
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    vulkan_learn::foundation::logging::init();
    run_app(
        ApplicationConfig::new("vulkan-learn", 640, 480),
        IndexBufferLesson::default(),
    )?;
    Ok(())
}
