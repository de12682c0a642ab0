//! Asset loading and procedural geometry

pub mod loader;
pub mod shape_gen;
pub mod vertex;

use thiserror::Error;

pub use loader::{load_binary, load_image, ImageData};
pub use shape_gen::Mesh;
pub use vertex::{VertexLayout, VertexPos, VertexPosCol, VertexPosTex};

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File does not exist
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// File exists but could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File contents could not be decoded
    #[error("Failed to decode {path}: {reason}")]
    Decode {
        /// Path that was decoded
        path: String,
        /// Decoder message
        reason: String,
    },

    /// Requested channel count is not 1 to 4
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u8),
}

/// Result type for asset operations
pub type AssetResult<T> = Result<T, AssetError>;
