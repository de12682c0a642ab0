//! Platform backends
//!
//! Vulkan device management plus the GLFW window it presents to.

pub mod vulkan;
