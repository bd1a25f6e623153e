//! Recovery: restore playable I-frames from carrier payloads

use crate::payload::parse_payload;
use crate::regenerate::PayloadRegenerator;
use crate::substitute::{read_unit_payload, write_unit_payload};
use carrier_codec::FrameCodec;
use carrier_common::{CarrierError, Result, StreamStats, NAL_TYPE_IDR};
use carrier_nal::{Advance, NalBackend};
use std::path::Path;
use tracing::{debug, info};

/// Walks a carrier stream and swaps every hidden payload for a regenerated I-frame
pub struct RecoveryEngine<'a, R> {
    backend: &'a dyn NalBackend,
    codec: &'a FrameCodec,
    regenerator: R,
}

impl<'a, R: PayloadRegenerator> RecoveryEngine<'a, R> {
    pub fn new(backend: &'a dyn NalBackend, codec: &'a FrameCodec, regenerator: R) -> Self {
        Self {
            backend,
            codec,
            regenerator,
        }
    }

    /// Write the restored stream of `input` to `output`
    pub fn recover(&mut self, input: &Path, output: &Path) -> Result<StreamStats> {
        let mut stream = self.backend.open(input, Some(output))?;
        let mut stats = StreamStats::default();

        while stream.advance()? == Advance::Unit {
            let unit_type = stream.unit_type()?;
            if unit_type == NAL_TYPE_IDR {
                let hidden = read_unit_payload(stream.as_ref())?;
                let (header, blob) = parse_payload(&hidden)?;
                let image = self.codec.unpack(blob)?;
                let restored = self.regenerator.regenerate(&image, &header.settings)?;
                if restored.is_empty() {
                    return Err(CarrierError::Regeneration(format!(
                        "empty I-frame regenerated for I-frame #{}",
                        stats.iframes
                    )));
                }
                debug!(
                    "I-frame #{}: {} byte payload -> {} byte slice",
                    stats.iframes,
                    hidden.len(),
                    restored.len()
                );
                write_unit_payload(stream.as_mut(), &restored)?;
            }
            stats.record(unit_type);
        }
        stream.close()?;

        info!(
            "Recovered {} I-frames ({} frames, {} NAL units)",
            stats.iframes, stats.frames, stats.total
        );
        Ok(stats)
    }
}
