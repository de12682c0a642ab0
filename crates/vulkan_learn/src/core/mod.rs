//! # Core Module
//!
//! Shared configuration types used by the backend and the frame driver.

pub mod config;

pub use config::{ApplicationConfig, Config, ConfigError, ContextConfig, ShaderConfig, WindowConfig};
