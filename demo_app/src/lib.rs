//! Shared plumbing for the lesson programs
//!
//! Every lesson draws into the swapchain with one render pass, one
//! pipeline and one reusable command buffer. The pieces here build those
//! objects on top of [`vulkan_learn::VulkanContext`] so each lesson only
//! spells out what it is teaching.

pub mod material;
pub mod motion;
pub mod pipeline;
pub mod render_pass;
pub mod upload;

pub use material::Material;
pub use motion::{orbit_wvp, Rainbow};
pub use pipeline::{load_shaders, PipelineDesc, ShaderPair};
pub use render_pass::{FrameCommands, SwapchainPass};
pub use upload::{upload_buffer, upload_texture};

use ash::vk;
use vulkan_learn::assets::shape_gen::Index;

/// Index type matching [`Index`] for `cmd_bind_index_buffer`
pub const INDEX_TYPE: vk::IndexType = match std::mem::size_of::<Index>() {
    2 => vk::IndexType::UINT16,
    _ => vk::IndexType::UINT32,
};

/// Viewport and scissor covering `rect` with the full depth range
pub fn viewport_for(rect: vk::Rect2D) -> vk::Viewport {
    vk::Viewport {
        x: rect.offset.x as f32,
        y: rect.offset.y as f32,
        width: rect.extent.width as f32,
        height: rect.extent.height as f32,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

/// Width over height, or 1.0 for a degenerate rect
pub fn aspect_ratio(rect: vk::Rect2D) -> f32 {
    if rect.extent.height == 0 {
        1.0
    } else {
        rect.extent.width as f32 / rect.extent.height as f32
    }
}
