//! Vulkan backend
//!
//! Synchronous device management: one device, one queue, one swapchain and
//! blocking submission. Memory comes from the Vulkan Memory Allocator.

pub mod context;
pub mod device;
pub mod error;
pub mod instance;
pub mod resource;
pub mod swapchain;
pub mod sync;
pub mod window;

pub use context::VulkanContext;
pub use error::{VulkanError, VulkanResult};
pub use instance::VulkanInstance;
pub use resource::{BufferResource, GpuResource, ImageResource, MemoryClass, ResourceAllocator, ResourceKind};
pub use swapchain::{color_subresource_range, SWAPCHAIN_FORMAT};
pub use sync::Fence;
pub use window::{SurfaceProvider, Window, WindowBackend, WindowError, WindowResult};
