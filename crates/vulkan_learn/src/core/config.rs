//! # Configuration
//!
//! Window, device-context and shader settings for lesson programs.
//! The lessons run on the built-in defaults; the same structures can be
//! loaded from TOML when a program wants a config file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// A value is out of range or otherwise unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration trait for TOML-backed settings
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Parse configuration from a TOML string
    fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Serialize configuration to TOML
    fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }
}

/// # Shader Configuration
///
/// Locates a pair of compiled SPIR-V files relative to the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShaderConfig {
    /// Path to the vertex shader SPIR-V file
    pub vertex_shader_path: String,
    /// Path to the fragment shader SPIR-V file
    pub fragment_shader_path: String,
}

impl ShaderConfig {
    /// Directories searched, in order, by [`ShaderConfig::with_path_resolution`]
    pub const SEARCH_DIRS: [&'static str; 5] = [
        "target/shaders/",
        "shaders/",
        "resources/shaders/",
        "../target/shaders/",
        "./",
    ];

    /// Create shader config with automatic path resolution
    ///
    /// Tries [`Self::SEARCH_DIRS`] so a lesson can be started from the
    /// workspace root or from its own directory. Falls back to
    /// `target/shaders/<name>` when nothing is found, which makes the later
    /// load fail with a path the user can act on.
    pub fn with_path_resolution(base_vertex: &str, base_fragment: &str) -> Self {
        Self {
            vertex_shader_path: resolve_in(&Self::SEARCH_DIRS, base_vertex),
            fragment_shader_path: resolve_in(&Self::SEARCH_DIRS, base_fragment),
        }
    }

    /// Validate that shader files exist
    pub fn validate(&self) -> Result<(), ConfigError> {
        for path in [&self.vertex_shader_path, &self.fragment_shader_path] {
            if !Path::new(path).exists() {
                return Err(ConfigError::Invalid(format!("Shader not found: {path}")));
            }
        }
        Ok(())
    }
}

fn resolve_in(dirs: &[&str], file: &str) -> String {
    dirs.iter()
        .map(|dir| format!("{dir}{file}"))
        .find(|candidate| Path::new(candidate).exists())
        .unwrap_or_else(|| format!("{}{file}", dirs[0]))
}

/// Window settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Client area width in pixels
    pub width: u32,
    /// Client area height in pixels
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "vulkan-learn".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Device context settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ContextConfig {
    /// Application name reported to the Vulkan instance
    pub application_name: String,
    /// Whether to enable the Khronos validation layer; `None` means debug builds only
    pub enable_validation: Option<bool>,
}

impl ContextConfig {
    /// Resolve the validation setting against the build type
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            application_name: "vulkan-learn".to_string(),
            enable_validation: None,
        }
    }
}

/// # Application Configuration
///
/// Top-level configuration handed to the frame driver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Window settings
    pub window: WindowConfig,
    /// Device context settings
    pub context: ContextConfig,
    /// Stop the frame loop when Escape is pressed
    pub quit_on_escape: bool,
}

impl ApplicationConfig {
    /// Create a configuration for a named lesson with a fixed window size
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        let name = name.into();
        Self {
            window: WindowConfig {
                title: name.clone(),
                width,
                height,
            },
            context: ContextConfig {
                application_name: name,
                enable_validation: None,
            },
            quit_on_escape: true,
        }
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.context.enable_validation = Some(enabled);
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "Window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }

        if self.context.application_name.is_empty() {
            return Err(ConfigError::Invalid("Application name cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            context: ContextConfig::default(),
            quit_on_escape: true,
        }
    }
}

impl Config for ApplicationConfig {}
