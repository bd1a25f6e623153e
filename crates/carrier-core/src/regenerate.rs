//! Re-encoding one image into the NAL payload a plain encode would produce

use crate::substitute::read_unit_payload;
use carrier_common::{CarrierError, Result, NAL_TYPE_IDR};
use carrier_nal::{Advance, NalBackend};
use carrier_transcode::{EncoderSettings, Transcoder};
use image::{ImageFormat, RgbImage};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// Produces the I-frame payload for a recovered image
pub trait PayloadRegenerator {
    fn regenerate(&mut self, image: &RgbImage, settings: &EncoderSettings) -> Result<Vec<u8>>;
}

impl<R: PayloadRegenerator + ?Sized> PayloadRegenerator for &mut R {
    fn regenerate(&mut self, image: &RgbImage, settings: &EncoderSettings) -> Result<Vec<u8>> {
        (**self).regenerate(image, settings)
    }
}

/// Payload of the first IDR unit in an elementary stream
pub fn first_idr_payload(backend: &dyn NalBackend, path: &Path) -> Result<Vec<u8>> {
    let mut stream = backend.open(path, None)?;
    while stream.advance()? == Advance::Unit {
        if stream.unit_type()? == NAL_TYPE_IDR {
            let payload = read_unit_payload(stream.as_ref())?;
            stream.close()?;
            return Ok(payload);
        }
    }
    stream.close()?;
    Err(CarrierError::Regeneration(format!(
        "{} contains no I-frame",
        path.display()
    )))
}

/// Single-frame path: PNG -> one-frame clip -> elementary stream -> first IDR payload
///
/// The clip is written with [`EncoderSettings::intermediate`] and the stream
/// with the carried settings, the same two passes encode ran.
pub struct SingleFrameEncoder<B> {
    transcoder: Transcoder,
    backend: B,
    scratch: TempDir,
}

impl<B: NalBackend> SingleFrameEncoder<B> {
    pub fn new(transcoder: Transcoder, backend: B) -> Result<Self> {
        let scratch = tempfile::Builder::new()
            .prefix("iframe-carrier-")
            .tempdir()?;
        Ok(Self {
            transcoder,
            backend,
            scratch,
        })
    }
}

impl<B: NalBackend> PayloadRegenerator for SingleFrameEncoder<B> {
    fn regenerate(&mut self, image: &RgbImage, settings: &EncoderSettings) -> Result<Vec<u8>> {
        let still = self.scratch.path().join("still.png");
        let clip = self.scratch.path().join("still.mp4");
        let stream = self.scratch.path().join("still.264");

        image.save_with_format(&still, ImageFormat::Png)?;
        self.transcoder
            .encode_still(&still, &clip, &settings.intermediate())?;
        self.transcoder.transcode(&clip, &stream, settings, None)?;
        let payload = first_idr_payload(&self.backend, &stream);

        for path in [&still, &clip, &stream] {
            let _ = std::fs::remove_file(path);
        }

        let payload = payload?;
        debug!(
            "Regenerated {}x{} image into {} byte I-frame",
            image.width(),
            image.height(),
            payload.len()
        );
        Ok(payload)
    }
}
