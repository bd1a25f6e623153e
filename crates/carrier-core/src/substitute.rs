//! Substitution: hide one frame blob in each I-frame payload

use crate::payload::{encode_payload, PayloadHeader};
use crate::select::FrameBlob;
use carrier_common::{CarrierError, Result, StreamStats, NAL_TYPE_IDR};
use carrier_nal::{Advance, NalBackend, NalStream};
use std::path::Path;
use tracing::{debug, info};

/// Read the current unit's payload, requiring the full size
pub fn read_unit_payload(stream: &dyn NalStream) -> Result<Vec<u8>> {
    let size = stream.unit_size()?;
    let mut payload = vec![0u8; size];
    let read = stream.read_payload(&mut payload)?;
    if read != size {
        return Err(CarrierError::SizeMismatch {
            expected: size,
            actual: read,
        });
    }
    Ok(payload)
}

/// Replace the current unit's payload, requiring every byte to be accepted
pub fn write_unit_payload(stream: &mut dyn NalStream, payload: &[u8]) -> Result<()> {
    let written = stream.write_payload(payload)?;
    if written != payload.len() {
        return Err(CarrierError::SizeMismatch {
            expected: payload.len(),
            actual: written,
        });
    }
    Ok(())
}

/// Copy `input` to `output`, replacing the Nth I-frame payload with the Nth blob
///
/// The number of I-frames must equal the number of blobs.
pub fn substitute(
    backend: &dyn NalBackend,
    input: &Path,
    output: &Path,
    blobs: &[FrameBlob],
    header: &PayloadHeader,
) -> Result<StreamStats> {
    let mut stream = backend.open(input, Some(output))?;
    let mut stats = StreamStats::default();

    while stream.advance()? == Advance::Unit {
        let unit_type = stream.unit_type()?;
        if unit_type == NAL_TYPE_IDR {
            let iframe = stats.iframes as usize;
            let blob = blobs.get(iframe).ok_or(CarrierError::BlobsExhausted {
                blobs: blobs.len(),
                iframe,
            })?;
            let payload = encode_payload(header, &blob.bytes)?;
            debug!(
                "I-frame #{} (frame {}): {} byte slice -> {} byte payload",
                iframe,
                blob.index,
                stream.unit_size()?,
                payload.len()
            );
            write_unit_payload(stream.as_mut(), &payload)?;
        }
        stats.record(unit_type);
    }

    if (stats.iframes as usize) < blobs.len() {
        return Err(CarrierError::UnusedBlobs {
            blobs: blobs.len(),
            iframes: stats.iframes as usize,
        });
    }
    stream.close()?;

    info!(
        "Substituted {} I-frames ({} frames, {} NAL units)",
        stats.iframes, stats.frames, stats.total
    );
    Ok(stats)
}
