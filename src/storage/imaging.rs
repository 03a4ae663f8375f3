//! Downscales and re-encodes images before they are stored.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat};

use super::StorageError;

/// Largest accepted upload before decoding.
pub const MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;
pub const DEFAULT_MAX_DIMENSION: u32 = 1600;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Decodes `bytes`, fits the image inside `max_dimension` (aspect ratio kept)
/// and re-encodes it: PNG when it has transparent pixels, JPEG otherwise.
pub fn prepare_for_upload(bytes: &[u8], max_dimension: u32) -> Result<PreparedImage, StorageError> {
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(StorageError::TooLarge { size: bytes.len(), max: MAX_UPLOAD_BYTES });
    }
    let format = image::guess_format(bytes).map_err(|_| StorageError::UnsupportedType("not an image".to_string()))?;
    let mut img = image::load_from_memory_with_format(bytes, format)?;

    let (width, height) = img.dimensions();
    if width > max_dimension || height > max_dimension {
        img = img.resize(max_dimension, max_dimension, FilterType::Lanczos3);
    }
    let (width, height) = img.dimensions();

    if has_transparency(&img) {
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(PreparedImage { bytes: out.into_inner(), mime_type: "image/png", extension: "png", width, height })
    } else {
        let mut out = Vec::new();
        let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY))?;
        Ok(PreparedImage { bytes: out, mime_type: "image/jpeg", extension: "jpg", width, height })
    }
}

fn has_transparency(img: &DynamicImage) -> bool {
    img.color().has_alpha() && img.to_rgba8().pixels().any(|p| p.0[3] < u8::MAX)
}
