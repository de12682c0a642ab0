//! # Vulkan Learn
//!
//! A deliberately small Vulkan framework for step-by-step rendering lessons.
//!
//! ## Features
//!
//! - **Synchronous submission**: every submit blocks until the GPU is done
//! - **RAII GPU memory**: shared buffer/image handles backed by VMA
//! - **Frame driver**: poll, update, acquire, render, present
//! - **Lesson helpers**: asset loading, simple shapes, vertex layouts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vulkan_learn::prelude::*;
//!
//! struct Clear;
//!
//! impl App for Clear {
//!     fn update(&mut self, _ctx: &mut VulkanContext, _dt: f64) -> AppResult<()> {
//!         Ok(())
//!     }
//!
//!     fn render(&mut self, _ctx: &mut VulkanContext, _frame: &Frame) -> AppResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     vulkan_learn::foundation::logging::init();
//!     run_app(ApplicationConfig::new("clear", 640, 480), Clear)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod assets;
pub mod backend;
pub mod app;

pub use app::{run_app, App, AppError, AppEvent, AppResult, DriverState, Frame, FrameDriver};
pub use backend::vulkan::{VulkanContext, VulkanError, VulkanResult};

/// Common imports for lesson programs
pub mod prelude {
    pub use crate::{
        app::{run_app, App, AppError, AppEvent, AppResult, Frame, FrameDriver},
        assets::{
            loader::{load_binary, load_image, ImageData},
            shape_gen,
            vertex::{VertexLayout, VertexPos, VertexPosCol, VertexPosTex},
        },
        backend::vulkan::{
            BufferResource, ImageResource, MemoryClass, VulkanContext, VulkanError, VulkanResult,
        },
        core::config::{ApplicationConfig, ShaderConfig},
        foundation::math::{Mat4, Mat4Ext, Vec3},
    };
}
