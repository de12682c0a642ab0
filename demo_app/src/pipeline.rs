//! Shader loading and graphics pipeline creation

use ash::vk;
use std::ffi::CStr;
use vulkan_learn::prelude::*;

const ENTRY_POINT: &CStr = c"main";

/// Compiled SPIR-V file names for a lesson's shader stages
///
/// The build script writes `<lesson>.vert.spv` and `<lesson>.frag.spv`.
pub fn shader_file_names(lesson: &str) -> (String, String) {
    (format!("{lesson}.vert.spv"), format!("{lesson}.frag.spv"))
}

/// Vertex and fragment shader modules of one lesson
#[derive(Debug, Clone, Copy)]
pub struct ShaderPair {
    /// Vertex stage
    pub vertex: vk::ShaderModule,
    /// Fragment stage
    pub fragment: vk::ShaderModule,
}

impl ShaderPair {
    /// Destroy both modules
    pub fn destroy(&mut self, ctx: &VulkanContext) {
        let Ok(device) = ctx.device() else { return };
        unsafe {
            device.destroy_shader_module(self.vertex, None);
            device.destroy_shader_module(self.fragment, None);
        }
        self.vertex = vk::ShaderModule::null();
        self.fragment = vk::ShaderModule::null();
    }
}

/// Find, read and wrap a lesson's compiled shaders
pub fn load_shaders(ctx: &VulkanContext, lesson: &str) -> AppResult<ShaderPair> {
    let (vertex_name, fragment_name) = shader_file_names(lesson);
    let config = ShaderConfig::with_path_resolution(&vertex_name, &fragment_name);
    log::info!(
        "Loading shaders {} and {}",
        config.vertex_shader_path,
        config.fragment_shader_path
    );

    config.validate()?;
    let vertex_code = load_binary(&config.vertex_shader_path)?;
    let fragment_code = load_binary(&config.fragment_shader_path)?;

    let vertex = ctx.create_shader_module(&vertex_code)?;
    let fragment = match ctx.create_shader_module(&fragment_code) {
        Ok(module) => module,
        Err(e) => {
            unsafe { ctx.device()?.destroy_shader_module(vertex, None) };
            return Err(e.into());
        }
    };
    Ok(ShaderPair { vertex, fragment })
}

/// What varies between the lesson pipelines
#[derive(Default)]
pub struct PipelineDesc<'a> {
    /// Vertex buffer binding at binding 0, or none for shaders that
    /// generate their own positions
    pub vertex_binding: Option<vk::VertexInputBindingDescription>,
    /// Attributes read from the vertex binding
    pub vertex_attributes: Vec<vk::VertexInputAttributeDescription>,
    /// Push constant ranges of the layout
    pub push_constant_ranges: &'a [vk::PushConstantRange],
    /// Descriptor set layouts of the layout
    pub set_layouts: &'a [vk::DescriptorSetLayout],
}

impl<'a> PipelineDesc<'a> {
    /// Pipeline reading `V` vertices from binding 0
    pub fn with_vertices<V: VertexLayout>() -> Self {
        Self {
            vertex_binding: Some(V::binding_description(0)),
            vertex_attributes: V::attribute_descriptions(0),
            ..Self::default()
        }
    }

    /// Add push constant ranges
    pub fn push_constants(mut self, ranges: &'a [vk::PushConstantRange]) -> Self {
        self.push_constant_ranges = ranges;
        self
    }

    /// Add descriptor set layouts
    pub fn descriptor_sets(mut self, layouts: &'a [vk::DescriptorSetLayout]) -> Self {
        self.set_layouts = layouts;
        self
    }

    /// Create the pipeline layout and a triangle-list pipeline for `render_pass`
    ///
    /// Fixed state: viewport and scissor match `rect`, back faces are culled
    /// with clockwise winding as front, no blending, no depth test.
    pub fn build(
        &self,
        ctx: &VulkanContext,
        render_pass: vk::RenderPass,
        shaders: &ShaderPair,
        rect: vk::Rect2D,
    ) -> VulkanResult<(vk::PipelineLayout, vk::Pipeline)> {
        let layout = ctx.create_pipeline_layout(
            &vk::PipelineLayoutCreateInfo::builder()
                .set_layouts(self.set_layouts)
                .push_constant_ranges(self.push_constant_ranges),
        )?;

        let stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(shaders.vertex)
                .name(ENTRY_POINT)
                .build(),
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::FRAGMENT)
                .module(shaders.fragment)
                .name(ENTRY_POINT)
                .build(),
        ];

        let bindings: Vec<_> = self.vertex_binding.into_iter().collect();
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&self.vertex_attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewports = [crate::viewport_for(rect)];
        let scissors = [rect];
        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewports(&viewports)
            .scissors(&scissors);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .polygon_mode(vk::PolygonMode::FILL)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .line_width(1.0);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blend = vk::PipelineColorBlendStateCreateInfo::builder()
            .attachments(&blend_attachments);

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blend)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        match ctx.create_graphics_pipeline(&pipeline_info) {
            Ok(pipeline) => Ok((layout, pipeline)),
            Err(e) => {
                unsafe { ctx.device()?.destroy_pipeline_layout(layout, None) };
                Err(e)
            }
        }
    }
}

/// Push constant range for a `T` block visible to `stages`
pub fn push_constant_range<T>(stages: vk::ShaderStageFlags) -> vk::PushConstantRange {
    vk::PushConstantRange {
        stage_flags: stages,
        offset: 0,
        size: std::mem::size_of::<T>() as u32,
    }
}

/// Destroy a pipeline and its layout
pub fn destroy_pipeline(ctx: &VulkanContext, layout: vk::PipelineLayout, pipeline: vk::Pipeline) {
    let Ok(device) = ctx.device() else { return };
    unsafe {
        device.destroy_pipeline(pipeline, None);
        device.destroy_pipeline_layout(layout, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_file_names_keep_stages_apart() {
        let (vert, frag) = shader_file_names("texture");
        assert_eq!(vert, "texture.vert.spv");
        assert_eq!(frag, "texture.frag.spv");
    }

    #[test]
    fn test_desc_with_vertices_describes_binding_zero() {
        let desc = PipelineDesc::with_vertices::<VertexPosCol>();
        let binding = desc.vertex_binding.unwrap();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 24);
        assert_eq!(desc.vertex_attributes.len(), 2);
        assert!(desc.push_constant_ranges.is_empty());
    }

    #[test]
    fn test_default_desc_has_no_vertex_input() {
        let desc = PipelineDesc::default();
        assert!(desc.vertex_binding.is_none());
        assert!(desc.vertex_attributes.is_empty());
    }

    #[test]
    fn test_push_constant_range_size() {
        let range = push_constant_range::<[f32; 16]>(vk::ShaderStageFlags::VERTEX);
        assert_eq!(range.size, 64);
        assert_eq!(range.offset, 0);
    }
}
