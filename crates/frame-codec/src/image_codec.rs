//! Still-image encoders for selected frames

use crate::CodecError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};

/// Default JPEG quality when none is configured
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encodes and decodes one RGB frame as a still image
pub trait ImageCodec: Send + Sync {
    /// Codec name used in logs and reports
    fn name(&self) -> &'static str;

    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, data: &[u8]) -> Result<RgbImage, CodecError>;
}

/// Lossless PNG
#[derive(Debug, Clone, Copy, Default)]
pub struct PngCodec;

impl ImageCodec for PngCodec {
    fn name(&self) -> &'static str {
        "png"
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(format!("png: {e}")))?;
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<RgbImage, CodecError> {
        decode_as(data, ImageFormat::Png)
    }
}

/// Lossy JPEG at a fixed quality
#[derive(Debug, Clone, Copy)]
pub struct JpegCodec {
    quality: u8,
}

impl JpegCodec {
    /// Quality must be in `1..=100`
    pub fn new(quality: u8) -> Result<Self, CodecError> {
        if !(1..=100).contains(&quality) {
            return Err(CodecError::Unsupported(format!(
                "JPEG quality {quality} out of range 1..=100"
            )));
        }
        Ok(Self { quality })
    }

    #[must_use]
    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self {
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageCodec for JpegCodec {
    fn name(&self) -> &'static str {
        "jpeg"
    }

    fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, self.quality)
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(format!("jpeg: {e}")))?;
        Ok(out)
    }

    fn decode(&self, data: &[u8]) -> Result<RgbImage, CodecError> {
        decode_as(data, ImageFormat::Jpeg)
    }
}

fn decode_as(data: &[u8], format: ImageFormat) -> Result<RgbImage, CodecError> {
    let img = image::load_from_memory_with_format(data, format)
        .map_err(|e| CodecError::Decode(format!("{format:?}: {e}")))?;
    Ok(img.to_rgb8())
}

/// Image codec selectable by name in configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    #[default]
    Png,
    Jpeg,
}

impl ImageKind {
    /// Build the codec; `quality` only applies to JPEG
    pub fn build(self, quality: u8) -> Result<Box<dyn ImageCodec>, CodecError> {
        Ok(match self {
            Self::Png => Box::new(PngCodec),
            Self::Jpeg => Box::new(JpegCodec::new(quality)?),
        })
    }
}

impl std::fmt::Display for ImageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        })
    }
}

impl std::str::FromStr for ImageKind {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "png" => Ok(Self::Png),
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            _ => Err(CodecError::Unsupported(format!(
                "unknown image codec '{s}'. Expected: png, jpeg"
            ))),
        }
    }
}
