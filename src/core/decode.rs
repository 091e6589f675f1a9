use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{imageops::FilterType, ColorType, DynamicImage, GenericImageView, ImageOutputFormat};
use serde::Serialize;

use crate::error::{AppError, Result};

/// Marker separating a data-URL header from its payload.
const DATA_URL_MARKER: &str = "base64,";

/// Limits applied to every decoded request image
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageLimits {
    /// Maximum decoded payload size in bytes
    pub max_bytes: usize,
    /// Images whose largest side exceeds this are downscaled to it
    pub max_dimension: u32,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024, // 10MiB
            max_dimension: 1024,
        }
    }
}

/// Color modes a decoded image is normalized into
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// 8-bit RGB
    Rgb,
    /// 8-bit single channel
    Grayscale,
}

/// An image in the form sent to the model: base64 payload plus MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type of `data`
    pub mime_type: &'static str,
    /// Base64 payload
    pub data: String,
}

/// A request image after decoding and normalization.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    image: DynamicImage,
    mode: ColorMode,
    source_bytes: usize,
}

impl DecodedImage {
    /// The normalized bitmap
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Color mode after normalization
    pub fn color_mode(&self) -> ColorMode {
        self.mode
    }

    /// Size of the base64-decoded payload this image came from
    pub fn source_bytes(&self) -> usize {
        self.source_bytes
    }

    /// Width and height in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Re-encode the bitmap as base64 PNG for upload. CPU bound.
    pub fn encode_png(&self) -> Result<EncodedImage> {
        let mut png = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
        Ok(EncodedImage {
            mime_type: "image/png",
            data: STANDARD.encode(&png),
        })
    }
}

/// Drop an optional `data:<mime>;base64,` header.
pub fn strip_data_url_prefix(input: &str) -> &str {
    match input.find(DATA_URL_MARKER) {
        Some(idx) => &input[idx + DATA_URL_MARKER.len()..],
        None => input,
    }
}

/// Decode a base64 (optionally data-URL) string into a normalized image.
///
/// Fails with [`AppError::InvalidImage`] when the input is empty, is not
/// valid base64, decodes to more than `limits.max_bytes`, or is not a
/// supported image container.
pub fn decode_base64_image(input: &str, limits: &ImageLimits) -> Result<DecodedImage> {
    let payload = strip_data_url_prefix(input.trim());
    let encoded_len = payload.bytes().filter(|b| !b.is_ascii_whitespace()).count();
    if encoded_len == 0 {
        return Err(AppError::InvalidImage("empty image data".to_string()));
    }

    // Every 4 symbols carry 3 bytes, less at most 2 for padding
    let min_decoded = (encoded_len / 4 * 3).saturating_sub(2);
    if min_decoded > limits.max_bytes {
        return Err(AppError::InvalidImage(format!(
            "decoded image is at least {} bytes, limit is {} bytes",
            min_decoded, limits.max_bytes
        )));
    }

    let payload: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = STANDARD.decode(payload.as_bytes())?;
    if bytes.len() > limits.max_bytes {
        return Err(AppError::InvalidImage(format!(
            "decoded image is {} bytes, limit is {} bytes",
            bytes.len(),
            limits.max_bytes
        )));
    }

    let image = image::load_from_memory(&bytes)
        .map_err(|e| AppError::InvalidImage(e.to_string()))?;

    let (image, mode) = normalize_color(image);
    let image = downscale(image, limits.max_dimension);

    log::debug!(
        "Decoded {} byte image to {:?} {:?}",
        bytes.len(),
        image.dimensions(),
        mode
    );

    Ok(DecodedImage {
        image,
        mode,
        source_bytes: bytes.len(),
    })
}

fn normalize_color(image: DynamicImage) -> (DynamicImage, ColorMode) {
    match image.color() {
        ColorType::Rgb8 => (image, ColorMode::Rgb),
        ColorType::L8 => (image, ColorMode::Grayscale),
        ColorType::L16 | ColorType::La8 | ColorType::La16 => (
            DynamicImage::ImageLuma8(image.to_luma8()),
            ColorMode::Grayscale,
        ),
        _ => (DynamicImage::ImageRgb8(image.to_rgb8()), ColorMode::Rgb),
    }
}

fn downscale(image: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    if width.max(height) <= max_dimension {
        return image;
    }
    // `resize` keeps the aspect ratio and fits within the bounds.
    image.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}
