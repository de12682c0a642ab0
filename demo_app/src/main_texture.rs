//! Texture: a spinning quad sampling a checkerboard image
//!
//! The image is uploaded through a staging buffer, transitioned for
//! sampling and bound through a combined image sampler descriptor.

use ash::vk;
use demo_app::pipeline::{destroy_pipeline, push_constant_range};
use demo_app::{
    aspect_ratio, load_shaders, orbit_wvp, upload_buffer, upload_texture, FrameCommands, Material,
    PipelineDesc, ShaderPair, SwapchainPass,
};
use std::path::Path;
use vulkan_learn::prelude::*;

const TEXTURE_FILE: &str = "textures/checker.png";
const TEXTURE_DIRS: [&str; 3] = ["resources/", "../resources/", "./"];

fn find_texture() -> String {
    TEXTURE_DIRS
        .iter()
        .map(|dir| format!("{dir}{TEXTURE_FILE}"))
        .find(|path| Path::new(path).exists())
        .unwrap_or_else(|| format!("{}{TEXTURE_FILE}", TEXTURE_DIRS[0]))
}

struct GpuObjects {
    commands: FrameCommands,
    pass: SwapchainPass,
    shaders: ShaderPair,
    material: Material,
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    vertex_buffer: BufferResource,
    index_buffer: BufferResource,
    index_count: u32,
}

#[derive(Default)]
struct TextureLesson {
    gpu: Option<GpuObjects>,
    aspect: f32,
    time: f32,
    wvp: [f32; 16],
}

impl App for TextureLesson {
    fn setup(&mut self, ctx: &mut VulkanContext, client_rect: vk::Rect2D) -> AppResult<()> {
        self.aspect = aspect_ratio(client_rect);
        let commands = FrameCommands::new(ctx)?;

        let image = load_image(find_texture(), 4)?;
        let texture = upload_texture(ctx, commands.pool(), &image, vk::Format::R8G8B8A8_SRGB)?;
        let material = Material::new(ctx, texture)?;

        let plane = shape_gen::make_plane(0.5);
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
        let shaders = load_shaders(ctx, "texture")?;
        let ranges = [push_constant_range::<[f32; 16]>(vk::ShaderStageFlags::VERTEX)];
        let set_layouts = [material.set_layout()];
        let (layout, pipeline) = PipelineDesc::with_vertices::<VertexPosTex>()
            .push_constants(&ranges)
            .descriptor_sets(&set_layouts)
            .build(ctx, pass.handle(), &shaders, client_rect)?;

        self.gpu = Some(GpuObjects {
            commands,
            pass,
            shaders,
            material,
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
            device.cmd_bind_descriptor_sets(
                cmd,
                vk::PipelineBindPoint::GRAPHICS,
                gpu.layout,
                0,
                &[gpu.material.descriptor_set()],
                &[],
            );
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
            gpu.material.destroy(ctx);
            gpu.pass.destroy(ctx);
            gpu.commands.destroy(ctx);
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    vulkan_learn::foundation::logging::init();
    run_app(
        ApplicationConfig::new("vulkan-learn", 640, 480),
        TextureLesson::default(),
    )?;
    Ok(())
}
