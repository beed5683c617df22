//! Screenshot encoding, serialization and persistence
//!
//! Raw pixel buffers handed back by the compositor are turned into RGBA
//! images and serialized as PNG with the `image` crate. Serialization can
//! fail in three distinct ways, each reported as its own
//! [`SerializeOutcome`] so the capture chain can fall back on any of them.

pub mod chain;
pub mod cli;

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use image::{ImageEncoder, RgbaImage};

use crate::error::{AutomationError, Result};

/// A completed capture
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Human-readable result message for the planning client
    pub message: String,
    pub image: RgbaImage,
    /// File the capture was persisted to, if persistence was requested
    pub path: Option<PathBuf>,
}

impl Screenshot {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// PNG-encode the image and return it as standard base64
    pub fn to_base64_png(&self) -> Result<String> {
        let png = encode_png(&self.image)
            .map_err(|e| AutomationError::Capture(format!("failed to encode PNG: {e}")))?;
        Ok(base64::engine::general_purpose::STANDARD.encode(png))
    }
}

/// Raw pixels from the compositor imaging call.
///
/// `data` is 32 bits per pixel in BGRX/BGRA byte order (X11 ZPixmap on a
/// little-endian server). The alpha byte is only meaningful at depth 32.
#[derive(Debug, Clone)]
pub struct RawImage {
    pub width: u32,
    pub height: u32,
    pub depth: u8,
    pub data: Vec<u8>,
}

/// Result of the serialization stage
#[derive(Debug)]
pub enum SerializeOutcome {
    Encoded { image: RgbaImage, png: Vec<u8> },
    /// The pixel buffer could not back an image destination
    NullDestination,
    /// Encoding completed but produced nothing usable
    Rejected,
    /// The encoder returned an error
    Raised(String),
}

/// Serialize a raw compositor buffer into an RGBA image plus its PNG bytes
pub fn serialize(raw: RawImage) -> SerializeOutcome {
    let RawImage {
        width,
        height,
        depth,
        data,
    } = raw;

    let expected = u64::from(width) * u64::from(height) * 4;
    if data.len() as u64 != expected {
        return SerializeOutcome::NullDestination;
    }

    let has_alpha = depth == 32;
    let mut rgba = data;
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
        if !has_alpha {
            px[3] = 0xff;
        }
    }

    let Some(image) = RgbaImage::from_raw(width, height, rgba) else {
        return SerializeOutcome::NullDestination;
    };

    if image.width() == 0 || image.height() == 0 {
        return SerializeOutcome::Rejected;
    }

    // GPU-backed ARGB windows the compositor refuses to share come back
    // fully transparent rather than as an error
    if has_alpha && image.pixels().all(|p| p.0[3] == 0) {
        return SerializeOutcome::Rejected;
    }

    match encode_png(&image) {
        Ok(png) if png.is_empty() => SerializeOutcome::Rejected,
        Ok(png) => SerializeOutcome::Encoded { image, png },
        Err(e) => SerializeOutcome::Raised(e.to_string()),
    }
}

/// Encode an RGBA image as PNG
pub fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut buffer);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// Write PNG bytes to a timestamped file under `dir`
pub fn persist_png(dir: &Path, png: &[u8]) -> Result<PathBuf> {
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%6f");
    let path = dir.join(format!("screenshot_{timestamp}.png"));

    fs::create_dir_all(dir).map_err(|source| AutomationError::Storage {
        path: dir.to_path_buf(),
        source,
    })?;
    fs::write(&path, png).map_err(|source| AutomationError::Storage {
        path: path.clone(),
        source,
    })?;

    tracing::debug!("Saved screenshot to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(width: u32, height: u32, depth: u8, pixel: [u8; 4]) -> RawImage {
        RawImage {
            width,
            height,
            depth,
            data: pixel.repeat((width * height) as usize),
        }
    }

    #[test]
    fn test_serialize_swaps_bgr_and_fills_alpha() {
        let outcome = serialize(raw(2, 2, 24, [10, 20, 30, 0]));
        let SerializeOutcome::Encoded { image, png } = outcome else {
            panic!("expected an encoded image");
        };
        assert_eq!(image.get_pixel(1, 1).0, [30, 20, 10, 255]);
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[test]
    fn test_serialize_short_buffer_is_null_destination() {
        let mut short = raw(4, 4, 24, [0, 0, 0, 0]);
        short.data.truncate(10);
        assert!(matches!(serialize(short), SerializeOutcome::NullDestination));
    }

    #[test]
    fn test_serialize_transparent_argb_is_rejected() {
        assert!(matches!(
            serialize(raw(3, 3, 32, [0, 0, 0, 0])),
            SerializeOutcome::Rejected
        ));
    }

    #[test]
    fn test_serialize_empty_is_rejected() {
        assert!(matches!(
            serialize(raw(0, 0, 24, [0, 0, 0, 0])),
            SerializeOutcome::Rejected
        ));
    }

    #[test]
    fn test_persist_png_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let png = encode_png(&RgbaImage::new(1, 1)).unwrap();
        let path = persist_png(dir.path(), &png).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("screenshot_"));
        assert!(name.ends_with(".png"));
        assert_eq!(fs::read(&path).unwrap(), png);
    }

    #[test]
    fn test_to_base64_png() {
        let shot = Screenshot {
            message: "ok".to_string(),
            image: RgbaImage::new(2, 2),
            path: None,
        };
        let encoded = shot.to_base64_png().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert!(decoded.starts_with(&[0x89, b'P', b'N', b'G']));
    }
}
