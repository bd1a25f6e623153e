//! Common types and utilities shared by the carrier crates

pub mod naming;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use naming::{available_path, available_path_avoiding, with_stem_suffix};

/// NAL unit type of an IDR (I-frame) coded slice
pub const NAL_TYPE_IDR: u8 = 5;

/// Carrier errors
#[derive(Debug, Error)]
pub enum CarrierError {
    #[error("NAL read error: {0}")]
    NalRead(String),

    #[error("Payload size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Frame blobs exhausted: I-frame #{iframe} has no blob ({blobs} blobs available)")]
    BlobsExhausted { blobs: usize, iframe: usize },

    #[error("Unused frame blobs: {blobs} blobs for only {iframes} I-frames")]
    UnusedBlobs { blobs: usize, iframes: usize },

    #[error("FFmpeg error: {0}")]
    FFmpegError(String),

    #[error("Corrupted carrier payload: {0}")]
    CorruptedPayload(String),

    #[error("Payload regeneration failed: {0}")]
    Regeneration(String),

    #[error("Image processing error: {0}")]
    ImageError(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<image::ImageError> for CarrierError {
    fn from(err: image::ImageError) -> Self {
        CarrierError::ImageError(err.to_string())
    }
}

/// Result type for carrier operations
pub type Result<T> = std::result::Result<T, CarrierError>;

/// Per-stream NAL unit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Every NAL unit seen
    pub total: u64,
    /// Coded slices (types 1..=5)
    pub frames: u64,
    /// IDR slices (type 5)
    pub iframes: u64,
}

impl StreamStats {
    /// Count one unit of the given type
    pub fn record(&mut self, unit_type: u8) {
        if is_slice(unit_type) {
            self.frames += 1;
        }
        if unit_type == NAL_TYPE_IDR {
            self.iframes += 1;
        }
        self.total += 1;
    }
}

/// Whether a NAL unit type is a coded slice (types 1..=5)
#[must_use]
pub fn is_slice(unit_type: u8) -> bool {
    (1..=NAL_TYPE_IDR).contains(&unit_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_stats_record() {
        let mut stats = StreamStats::default();
        for unit_type in [7, 8, 6, 5, 1, 1, 2, 5, 1, 9, 12] {
            stats.record(unit_type);
        }

        assert_eq!(stats.total, 11);
        assert_eq!(stats.frames, 6);
        assert_eq!(stats.iframes, 2);
        assert!(stats.total >= stats.frames);
    }

    #[test]
    fn test_is_slice() {
        assert!(!is_slice(0));
        assert!(is_slice(1));
        assert!(is_slice(4));
        assert!(is_slice(5));
        assert!(!is_slice(6));
        assert!(!is_slice(7));
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = CarrierError::SizeMismatch {
            expected: 120,
            actual: 117,
        };
        assert_eq!(
            err.to_string(),
            "Payload size mismatch: expected 120 bytes, got 117"
        );
    }
}
