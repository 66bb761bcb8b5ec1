//! Reference image handling for uploads.
//!
//! Uploads are validated by MIME type and size, downscaled when either side
//! exceeds [`MAX_IMAGE_DIMENSION`], and turned into a `data:` URL that is
//! used as the opaque image reference of a generation request.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::GenericImageView;

use crate::error::CoreError;

/// Maximum accepted upload size (10 MiB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Longest side, in pixels, kept for reference images.
pub const MAX_IMAGE_DIMENSION: u32 = 1920;

/// JPEG quality used when re-encoding a downscaled image.
pub const DOWNSCALE_JPEG_QUALITY: u8 = 90;

/// MIME types accepted for reference images.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

/// Validate an upload by MIME type and size.
///
/// Returns the user-facing error message, or `None` when the file is
/// acceptable.
pub fn validate_image_file(mime: &str, size: usize) -> Option<&'static str> {
    if !mime.starts_with("image/") {
        return Some("Please select an image file");
    }
    if !ACCEPTED_MIME_TYPES.contains(&mime) {
        return Some("Please select a PNG or JPG file");
    }
    if size > MAX_FILE_SIZE {
        return Some("File size must be less than 10MB");
    }
    None
}

/// Encode raw bytes as a base64 `data:` URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{mime};base64,{encoded}")
}

/// Scale `(width, height)` so that neither side exceeds `max_dimension`,
/// preserving the aspect ratio. Dimensions already within bounds are
/// returned unchanged.
pub fn fit_within(width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (width, height);
    }
    let (w, h, max) = (width as f64, height as f64, max_dimension as f64);
    if width > height {
        (max_dimension, ((h / w) * max).round().max(1.0) as u32)
    } else {
        (((w / h) * max).round().max(1.0) as u32, max_dimension)
    }
}

/// Decode `bytes`, resize so the longest side is at most `max_dimension`,
/// and re-encode as JPEG.
pub fn downscale_image(bytes: &[u8], max_dimension: u32) -> Result<Vec<u8>, CoreError> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| CoreError::Image(format!("Failed to load image: {e}")))?;

    let (width, height) = img.dimensions();
    let (new_w, new_h) = fit_within(width, height, max_dimension);
    let resized = img.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, DOWNSCALE_JPEG_QUALITY)
        .encode_image(&resized)
        .map_err(|e| CoreError::Image(format!("Failed to encode image: {e}")))?;
    Ok(buf)
}

/// Turn an uploaded file into the image reference used by generation
/// requests.
///
/// Validation failures surface as [`CoreError::Validation`] with the
/// user-facing message; undecodable content as [`CoreError::Image`].
pub fn prepare_reference_image(mime: &str, bytes: &[u8]) -> Result<String, CoreError> {
    if let Some(msg) = validate_image_file(mime, bytes.len()) {
        return Err(CoreError::Validation(msg.to_string()));
    }

    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CoreError::Image(format!("Failed to read image: {e}")))?
        .into_dimensions()
        .map_err(|e| CoreError::Image(format!("Failed to read image: {e}")))?;

    if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
        let scaled = downscale_image(bytes, MAX_IMAGE_DIMENSION)?;
        return Ok(to_data_url("image/jpeg", &scaled));
    }
    Ok(to_data_url(mime, bytes))
}
