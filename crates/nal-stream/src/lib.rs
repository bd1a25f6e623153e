//! Sequential reader/writer over an Annex-B H.264 elementary stream
//!
//! A walker exposes one NAL unit at a time. On a writable walker every unit
//! is copied to the output as the cursor moves past it, with a replaced
//! payload re-escaped and everything else copied byte for byte.
//!
//! # Example
//!
//! ```no_run
//! use carrier_nal::{Advance, Backend, NalBackend};
//! use std::path::Path;
//!
//! let mut stream = Backend::Streaming.open(Path::new("clip.264"), None)?;
//! while let Advance::Unit = stream.advance()? {
//!     println!("type {} size {}", stream.unit_type()?, stream.unit_size()?);
//! }
//! stream.close()?;
//! # Ok::<(), carrier_nal::NalError>(())
//! ```

pub mod annexb;
mod buffered;
pub mod rbsp;
mod streaming;
mod unit;

pub use buffered::BufferedWalker;
pub use streaming::StreamingWalker;
pub use unit::NalUnitType;

use carrier_common::CarrierError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// NAL walker errors
#[derive(Debug, Error)]
pub enum NalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no start code found at offset {offset}")]
    MissingStartCode { offset: u64 },

    #[error("start code at offset {offset} has no NAL header")]
    TruncatedUnit { offset: u64 },

    #[error("forbidden_zero_bit set in NAL header at offset {offset}")]
    ForbiddenBit { offset: u64 },

    #[error("no current NAL unit (advance first)")]
    NoCurrentUnit,

    #[error("stream was opened read-only")]
    ReadOnly,

    #[error("refusing to write an empty payload")]
    EmptyPayload,

    #[error("payload ends in an odd run of zero bytes ({len} bytes), which escaping cannot preserve")]
    TrailingZero { len: usize },

    #[error("unknown NAL backend: {0}")]
    UnknownBackend(String),
}

impl From<NalError> for CarrierError {
    fn from(err: NalError) -> Self {
        match err {
            NalError::Io(e) => CarrierError::IoError(e),
            NalError::UnknownBackend(name) => {
                CarrierError::InvalidConfig(format!("unknown NAL backend: {name}"))
            }
            other => CarrierError::NalRead(other.to_string()),
        }
    }
}

/// Outcome of moving the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor now holds a unit
    Unit,
    /// No units remain
    End,
}

/// Cursor over the NAL units of one elementary stream
pub trait NalStream {
    /// Move to the next unit
    fn advance(&mut self) -> Result<Advance, NalError>;

    /// Type of the current unit (`header & 0x1F`)
    fn unit_type(&self) -> Result<u8, NalError>;

    /// Payload size of the current unit, without emulation prevention bytes
    fn unit_size(&self) -> Result<usize, NalError>;

    /// Copy the current payload into `buf`, returning the number of bytes copied
    fn read_payload(&self, buf: &mut [u8]) -> Result<usize, NalError>;

    /// Replace the current payload, returning the number of bytes accepted
    ///
    /// The payload must be non-empty and must not end in an odd number of zero
    /// bytes, otherwise reading it back would not return the same bytes.
    /// Carrier payloads and real slice data end in a stop bit and always qualify.
    fn write_payload(&mut self, payload: &[u8]) -> Result<usize, NalError>;

    /// Finish the stream; a writable stream copies any remaining units through
    fn close(self: Box<Self>) -> Result<(), NalError>;
}

/// Opens [`NalStream`]s
pub trait NalBackend {
    /// Open `input`; with `output`, units are written there as the cursor advances
    fn open(&self, input: &Path, output: Option<&Path>) -> Result<Box<dyn NalStream>, NalError>;
}

/// Available walker implementations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Incremental reader/writer, memory bounded by the largest unit
    #[default]
    Streaming,
    /// Whole stream parsed at open, whole output written at close
    Buffered,
}

impl Backend {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Backend::Streaming => "streaming",
            Backend::Buffered => "buffered",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = NalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "streaming" => Ok(Backend::Streaming),
            "buffered" => Ok(Backend::Buffered),
            other => Err(NalError::UnknownBackend(other.to_string())),
        }
    }
}

impl NalBackend for Backend {
    fn open(&self, input: &Path, output: Option<&Path>) -> Result<Box<dyn NalStream>, NalError> {
        Ok(match self {
            Backend::Streaming => Box::new(StreamingWalker::open(input, output)?),
            Backend::Buffered => Box::new(BufferedWalker::open(input, output)?),
        })
    }
}

/// Reject payloads `write_payload` cannot store exactly
fn check_payload(payload: &[u8]) -> Result<(), NalError> {
    if payload.is_empty() {
        return Err(NalError::EmptyPayload);
    }
    if !rbsp::survives_escaping(payload) {
        return Err(NalError::TrailingZero { len: payload.len() });
    }
    Ok(())
}

/// Copy a payload into `buf`, which must be exactly as long as the payload
fn copy_payload(payload: &[u8], buf: &mut [u8]) -> usize {
    let n = payload.len().min(buf.len());
    buf[..n].copy_from_slice(&payload[..n]);
    n
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("streaming".parse::<Backend>().unwrap(), Backend::Streaming);
        assert_eq!("Buffered".parse::<Backend>().unwrap(), Backend::Buffered);
        assert!("mmap".parse::<Backend>().is_err());
    }

    #[test]
    fn test_backend_serde_names() {
        assert_eq!(serde_json::to_string(&Backend::Buffered).unwrap(), "\"buffered\"");
        let backend: Backend = serde_json::from_str("\"streaming\"").unwrap();
        assert_eq!(backend, Backend::Streaming);
    }

    #[test]
    fn test_nal_error_maps_to_carrier_error() {
        let err: CarrierError = NalError::ForbiddenBit { offset: 7 }.into();
        assert!(matches!(err, CarrierError::NalRead(_)));
        assert!(err.to_string().contains("offset 7"));

        let err: CarrierError = NalError::UnknownBackend("mmap".into()).into();
        assert!(matches!(err, CarrierError::InvalidConfig(_)));
    }
}
