//! Frame codec: still-image encoding plus byte compression
//!
//! A selected frame becomes `compress(image_encode(frame))`. The same
//! [`FrameCodec::round_trip`] call also returns the image that blob decodes
//! to, so the transcoder is fed exactly what the decoder will later recover.

pub mod compression;
pub mod image_codec;

pub use compression::Compression;
pub use image_codec::{ImageCodec, ImageKind, JpegCodec, PngCodec, DEFAULT_JPEG_QUALITY};

use carrier_common::CarrierError;
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

/// Frame codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Image decoding failed: {0}")]
    Decode(String),

    #[error("Compression failed: {0}")]
    Compression(String),

    #[error("Unsupported codec setting: {0}")]
    Unsupported(String),
}

impl From<CodecError> for CarrierError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Encode(msg) | CodecError::Decode(msg) => CarrierError::ImageError(msg),
            CodecError::Compression(msg) => CarrierError::Compression(msg),
            CodecError::Unsupported(msg) => CarrierError::InvalidConfig(msg),
        }
    }
}

/// Image codec and compression applied to every carried frame
pub struct FrameCodec {
    image: Box<dyn ImageCodec>,
    compression: Compression,
}

impl FrameCodec {
    pub fn new(image: Box<dyn ImageCodec>, compression: Compression) -> Self {
        Self { image, compression }
    }

    /// Image codec name
    pub fn image_name(&self) -> &'static str {
        self.image.name()
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Encode and compress one frame into a blob
    pub fn pack(&self, frame: &RgbImage) -> Result<Vec<u8>, CodecError> {
        let encoded = self.image.encode(frame)?;
        let blob = self.compression.compress(&encoded)?;
        debug!(
            "Packed {}x{} frame: {} {} bytes -> {} {} bytes",
            frame.width(),
            frame.height(),
            encoded.len(),
            self.image.name(),
            blob.len(),
            self.compression
        );
        Ok(blob)
    }

    /// Decompress and decode a blob back into a frame
    pub fn unpack(&self, blob: &[u8]) -> Result<RgbImage, CodecError> {
        let encoded = self.compression.decompress(blob)?;
        self.image.decode(&encoded)
    }

    /// Pack a frame and return both the blob and the image it decodes to
    pub fn round_trip(&self, frame: &RgbImage) -> Result<(Vec<u8>, RgbImage), CodecError> {
        let blob = self.pack(frame)?;
        let image = self.unpack(&blob)?;
        Ok((blob, image))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(Box::new(PngCodec), Compression::default())
    }
}

impl std::fmt::Debug for FrameCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCodec")
            .field("image", &self.image.name())
            .field("compression", &self.compression)
            .finish()
    }
}
