//! File loading for shader binaries and textures

use super::{AssetError, AssetResult};
use std::io::ErrorKind;
use std::path::Path;

/// Decoded image ready for GPU upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Channels per pixel, 1 to 4
    pub channel_count: u8,
    /// Tightly packed 8-bit pixel data, row-major
    pub pixels: Vec<u8>,
}

impl ImageData {
    /// Get the size of the pixel data in bytes
    pub fn size_bytes(&self) -> usize {
        self.pixels.len()
    }
}

/// Read a whole file into memory
pub fn load_binary(path: impl AsRef<Path>) -> AssetResult<Vec<u8>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    log::debug!("Loaded {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

/// Decode an image file, converting it to `desired_channels` channels
///
/// 1 is luminance, 2 luminance+alpha, 3 RGB and 4 RGBA, each 8 bits.
pub fn load_image(path: impl AsRef<Path>, desired_channels: u8) -> AssetResult<ImageData> {
    let path = path.as_ref();
    if !(1..=4).contains(&desired_channels) {
        return Err(AssetError::UnsupportedChannels(desired_channels));
    }

    let bytes = load_binary(path)?;
    let img = image::load_from_memory(&bytes).map_err(|e| AssetError::Decode {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let (width, height) = (img.width(), img.height());
    let pixels = match desired_channels {
        1 => img.to_luma8().into_raw(),
        2 => img.to_luma_alpha8().into_raw(),
        3 => img.to_rgb8().into_raw(),
        _ => img.to_rgba8().into_raw(),
    };

    log::info!(
        "Loaded image {}x{} ({} channels) from {}",
        width,
        height,
        desired_channels,
        path.display()
    );

    Ok(ImageData {
        width,
        height,
        channel_count: desired_channels,
        pixels,
    })
}

fn io_error(path: &Path, error: std::io::Error) -> AssetError {
    if error.kind() == ErrorKind::NotFound {
        AssetError::NotFound(path.display().to_string())
    } else {
        AssetError::Io {
            path: path.display().to_string(),
            source: error,
        }
    }
}
