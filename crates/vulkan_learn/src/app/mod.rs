//! Application layer
//!
//! A lesson implements [`App`]; the [`FrameDriver`] owns the window and the
//! device context and calls the app once for setup, then once per frame
//! for update and render, and once more for teardown.

pub mod driver;

pub use driver::{run_app, DriverState, FrameDriver, SwapchainTarget};

use crate::assets::AssetError;
use crate::backend::vulkan::{VulkanContext, VulkanError, WindowError};
use crate::core::config::ConfigError;
use ash::vk;
use thiserror::Error;

/// Per-program callbacks driven by the [`FrameDriver`]
///
/// `C` is the device context type; lessons use the default
/// [`VulkanContext`].
pub trait App<C = VulkanContext> {
    /// Create pipelines, buffers and other long-lived objects
    ///
    /// `client_rect` covers the whole swapchain image.
    fn setup(&mut self, _ctx: &mut C, _client_rect: vk::Rect2D) -> AppResult<()> {
        Ok(())
    }

    /// Advance per-frame state by `delta_time` seconds
    fn update(&mut self, ctx: &mut C, delta_time: f64) -> AppResult<()>;

    /// Record and submit the commands drawing into `frame.swapbuffer`
    fn render(&mut self, ctx: &mut C, frame: &Frame) -> AppResult<()>;

    /// Destroy everything created in `setup`
    ///
    /// Called once, after the device has gone idle.
    fn teardown(&mut self, _ctx: &mut C) {}

    /// Observe a window event before the frame is updated
    fn handle_event(&mut self, _event: &AppEvent) -> AppResult<()> {
        Ok(())
    }
}

/// Per-frame data handed to [`App::render`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Index of the acquired swapchain image
    pub swapbuffer: u32,
    /// Render area covering the swapchain image
    pub client_rect: vk::Rect2D,
    /// Seconds since the previous frame
    pub delta_time: f64,
}

/// Window events forwarded to the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The user asked to close the window
    CloseRequested,

    /// The drawable area changed size
    Resized {
        /// New width in pixels
        width: u32,
        /// New height in pixels
        height: u32,
    },

    /// A key was pressed or released
    Key {
        /// Key identifier
        key: glfw::Key,
        /// `true` on press, `false` on release
        pressed: bool,
    },
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Vulkan operation failed
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] VulkanError),

    /// Asset could not be loaded
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Window system failed
    #[error("Window error: {0}")]
    Window(#[from] WindowError),

    /// Configuration is invalid
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Frame driver used out of order
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Application error
    #[error("Application error: {0}")]
    Custom(String),
}

/// Result type for application callbacks
pub type AppResult<T> = Result<T, AppError>;
