//! Push constants: a triangle whose color and size change every frame
//!
//! The vertex shader builds the triangle from `gl_VertexIndex`, so there is
//! no vertex buffer. Color and scale reach both stages as push constants.

use ash::vk;
use demo_app::pipeline::{destroy_pipeline, push_constant_range};
use demo_app::{load_shaders, FrameCommands, PipelineDesc, Rainbow, ShaderPair, SwapchainPass};
use vulkan_learn::prelude::*;

const CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::VERTEX.as_raw() | vk::ShaderStageFlags::FRAGMENT.as_raw(),
);

struct GpuObjects {
    commands: FrameCommands,
    pass: SwapchainPass,
    shaders: ShaderPair,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

#[derive(Default)]
struct PushConstantLesson {
    gpu: Option<GpuObjects>,
    rainbow: Rainbow,
}

impl App for PushConstantLesson {
    fn setup(&mut self, ctx: &mut VulkanContext, client_rect: vk::Rect2D) -> AppResult<()> {
        let commands = FrameCommands::new(ctx)?;
        let pass = SwapchainPass::new(ctx, client_rect)?;
        let shaders = load_shaders(ctx, "push_constant")?;

        let ranges = [push_constant_range::<demo_app::motion::ColorConstants>(CONSTANT_STAGES)];
        let (layout, pipeline) = PipelineDesc::default()
            .push_constants(&ranges)
            .build(ctx, pass.handle(), &shaders, client_rect)?;

        self.gpu = Some(GpuObjects {
            commands,
            pass,
            shaders,
            layout,
            pipeline,
        });
        Ok(())
    }

    fn update(&mut self, _ctx: &mut VulkanContext, delta_time: f64) -> AppResult<()> {
        self.rainbow.update(delta_time);
        Ok(())
    }

    fn render(&mut self, ctx: &mut VulkanContext, frame: &Frame) -> AppResult<()> {
        let gpu = self
            .gpu
            .as_ref()
            .ok_or_else(|| AppError::InvalidState("render before setup".to_string()))?;
        let constants = *self.rainbow.constants();

        gpu.commands.record_and_submit(ctx, |device, cmd| unsafe {
            gpu.pass.begin(device, cmd, frame.swapbuffer, frame.client_rect, [0.0; 4])?;
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, gpu.pipeline);
            device.cmd_push_constants(
                cmd,
                gpu.layout,
                CONSTANT_STAGES,
                0,
                bytemuck::bytes_of(&constants),
            );
            device.cmd_draw(cmd, 3, 1, 0, 0);
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
        PushConstantLesson::default(),
    )?;
    Ok(())
}
