//! Carrier payload: the bytes written into an I-frame unit
//!
//! ```text
//! offset  size  field
//!      0     3  magic "IFC"
//!      3     1  format version
//!      4     1  x264 preset index
//!      5     1  x264 CRF
//!      6     4  keyframe interval (u32, big-endian)
//!     10     4  blob length L (u32, big-endian)
//!     14     L  frame blob
//!   14+L     1  stop byte 0x80
//! ```

use carrier_common::{CarrierError, Result};
use carrier_transcode::{EncoderSettings, X264Preset, MAX_CRF};

pub const MAGIC: &[u8; 3] = b"IFC";
pub const VERSION: u8 = 1;
pub const HEADER_LEN: usize = 14;
/// Mirrors `rbsp_trailing_bits` so the payload never ends in a zero byte
pub const STOP_BYTE: u8 = 0x80;
/// Bytes a payload adds around its blob
pub const OVERHEAD: usize = HEADER_LEN + 1;

/// Settings recorded alongside every hidden frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloadHeader {
    /// Encoder settings decode must reuse to regenerate the I-frame
    pub settings: EncoderSettings,
    /// Keyframe interval used by encode
    pub interval: u32,
}

/// Wrap a frame blob into a carrier payload
pub fn encode_payload(header: &PayloadHeader, blob: &[u8]) -> Result<Vec<u8>> {
    let blob_len = u32::try_from(blob.len()).map_err(|_| {
        CarrierError::InvalidConfig(format!("frame blob of {} bytes is too large", blob.len()))
    })?;

    let mut payload = Vec::with_capacity(blob.len() + OVERHEAD);
    payload.extend_from_slice(MAGIC);
    payload.push(VERSION);
    payload.push(header.settings.preset.index());
    payload.push(header.settings.crf);
    payload.extend_from_slice(&header.interval.to_be_bytes());
    payload.extend_from_slice(&blob_len.to_be_bytes());
    payload.extend_from_slice(blob);
    payload.push(STOP_BYTE);
    Ok(payload)
}

/// Whether `payload` starts like a carrier payload
#[must_use]
pub fn is_carrier_payload(payload: &[u8]) -> bool {
    payload.len() >= OVERHEAD && &payload[..3] == MAGIC && payload[3] == VERSION
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Split a carrier payload into its header and frame blob
pub fn parse_payload(payload: &[u8]) -> Result<(PayloadHeader, &[u8])> {
    if payload.len() < OVERHEAD {
        return Err(CarrierError::CorruptedPayload(format!(
            "{} bytes is shorter than the {OVERHEAD} byte envelope",
            payload.len()
        )));
    }
    if &payload[..3] != MAGIC {
        return Err(CarrierError::CorruptedPayload(
            "missing carrier magic".to_string(),
        ));
    }
    if payload[3] != VERSION {
        return Err(CarrierError::CorruptedPayload(format!(
            "unsupported payload version {}",
            payload[3]
        )));
    }

    let blob_len = be_u32(&payload[10..14]) as usize;
    let expected = blob_len + OVERHEAD;
    if expected != payload.len() {
        return Err(CarrierError::SizeMismatch {
            expected,
            actual: payload.len(),
        });
    }
    if payload[payload.len() - 1] != STOP_BYTE {
        return Err(CarrierError::CorruptedPayload(
            "missing stop byte".to_string(),
        ));
    }

    let preset = X264Preset::from_index(payload[4]).ok_or_else(|| {
        CarrierError::CorruptedPayload(format!("unknown preset index {}", payload[4]))
    })?;
    let crf = payload[5];
    if crf > MAX_CRF {
        return Err(CarrierError::CorruptedPayload(format!("CRF {crf} out of range")));
    }

    let header = PayloadHeader {
        settings: EncoderSettings { preset, crf },
        interval: be_u32(&payload[6..10]),
    };
    Ok((header, &payload[HEADER_LEN..HEADER_LEN + blob_len]))
}
