//! Encode, decode, extract and inspect pipelines

use crate::config::Config;
use crate::payload::{is_carrier_payload, parse_payload, PayloadHeader};
use crate::recover::RecoveryEngine;
use crate::regenerate::{PayloadRegenerator, SingleFrameEncoder};
use crate::scratch::ScratchFiles;
use crate::select::{select_frames, FrameBlob};
use crate::substitute::{read_unit_payload, substitute};
use carrier_codec::FrameCodec;
use carrier_common::{
    available_path, available_path_avoiding, with_stem_suffix, CarrierError, Result,
    StreamStats, NAL_TYPE_IDR,
};
use carrier_nal::{Advance, Backend, NalBackend, NalUnitType};
use carrier_transcode::{EncoderSettings, Transcoder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Extension of the carrier elementary stream
pub const CARRIER_EXTENSION: &str = "lrc";

/// Outcome of [`Carrier::encode`]
#[derive(Debug, Clone, Serialize)]
pub struct EncodeReport {
    pub carrier: PathBuf,
    /// Keyframe-aligned stream before substitution
    pub plain_stream: PathBuf,
    /// Intermediate container, when kept
    pub intermediate: Option<PathBuf>,
    /// Frames decoded from the input and re-encoded
    pub source_frames: u64,
    pub stats: StreamStats,
    pub blobs: usize,
    /// Bytes of all frame blobs
    pub hidden_bytes: u64,
    pub verify: Option<VerifyReport>,
}

/// Sizes from regenerating every carried image after encode
#[derive(Debug, Clone, Copy, Serialize)]
pub struct VerifyReport {
    pub images: usize,
    pub hidden_bytes: u64,
    pub restored_bytes: u64,
}

/// Outcome of [`Carrier::decode`]
#[derive(Debug, Clone, Serialize)]
pub struct DecodeReport {
    pub output: PathBuf,
    pub recovered_stream: Option<PathBuf>,
    pub stats: StreamStats,
}

/// Outcome of [`Carrier::extract`]
#[derive(Debug, Clone, Serialize)]
pub struct ExtractReport {
    pub frames: Vec<PathBuf>,
    pub stats: StreamStats,
}

/// Outcome of [`Carrier::inspect`]
#[derive(Debug, Clone, Serialize)]
pub struct StreamReport {
    pub path: PathBuf,
    pub size: u64,
    pub stats: StreamStats,
    /// NAL unit count per type label
    pub unit_types: BTreeMap<String, u64>,
    pub carrier_payloads: u64,
    pub hidden_bytes: u64,
}

/// Both pipelines plus the read-only stream tools
pub struct Carrier {
    transcoder: Transcoder,
    codec: FrameCodec,
    settings: EncoderSettings,
    backend: Backend,
    keep_intermediates: bool,
}

fn require_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(CarrierError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn stem_path(path: &Path, extension: &str) -> PathBuf {
    path.with_extension(extension)
}

impl Carrier {
    pub fn new(
        transcoder: Transcoder,
        codec: FrameCodec,
        settings: EncoderSettings,
        backend: Backend,
    ) -> Self {
        Self {
            transcoder,
            codec,
            settings,
            backend,
            keep_intermediates: false,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            config.transcoder(),
            config.frame_codec()?,
            config.encoder_settings()?,
            config.backend(),
        )
        .keep_intermediates(config.keep_intermediates()))
    }

    #[must_use]
    pub fn keep_intermediates(mut self, keep: bool) -> Self {
        self.keep_intermediates = keep;
        self
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    pub fn settings(&self) -> EncoderSettings {
        self.settings
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// Hide every `interval`th frame of `input` in a carrier stream `<stem>.lrc`
    pub fn encode(&self, input: &Path, interval: u32, verify: bool) -> Result<EncodeReport> {
        require_file(input)?;
        if interval == 0 {
            return Err(CarrierError::InvalidConfig(
                "interval must be at least 1".to_string(),
            ));
        }

        let dir = parent_dir(input);
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "mp4".to_string());
        let mut scratch = ScratchFiles::new(self.keep_intermediates);
        let intermediate = scratch.track(available_path(&with_stem_suffix(
            &stem_path(input, &extension),
            "_enc",
        )));
        // A .264 input gives the intermediate the plain stream's name
        let plain_stream = available_path_avoiding(
            &with_stem_suffix(&stem_path(input, "264"), "_enc"),
            &[intermediate.as_path()],
        );
        let carrier = available_path(&stem_path(input, CARRIER_EXTENSION));

        info!(
            "Encoding {} (interval {}, {} + {}, preset {}, crf {})",
            input.display(),
            interval,
            self.codec.image_name(),
            self.codec.compression(),
            self.settings.preset,
            self.settings.crf
        );

        // 1. select frames while re-encoding into the intermediate container
        let info = self.transcoder.probe(input)?;
        let frames = self.transcoder.read_frames(input, &info)?;
        let mut writer = self
            .transcoder
            .write_frames(&intermediate, &info, &self.settings.intermediate())?;
        let blobs = select_frames(frames, &mut writer, interval, &self.codec)?;
        let source_frames = writer.finish()?;
        if let Some(expected) = info.frame_count.filter(|&n| n != source_frames) {
            warn!(
                "Container declares {} frames but {} were decoded",
                expected, source_frames
            );
        }
        info!("Wrote {} frames to {}", source_frames, intermediate.display());

        // 2. keyframe-aligned elementary stream
        self.transcoder
            .transcode(&intermediate, &plain_stream, &self.settings, Some(interval))?;

        // 3. substitute into a staged file, moved into place on success
        let header = PayloadHeader {
            settings: self.settings,
            interval,
        };
        let staged = tempfile::Builder::new()
            .prefix(".iframe-carrier-")
            .suffix(".lrc")
            .tempfile_in(&dir)?;
        let stats = substitute(&self.backend, &plain_stream, staged.path(), &blobs, &header)?;
        staged
            .persist_noclobber(&carrier)
            .map_err(|e| CarrierError::IoError(e.error))?;

        let hidden_bytes = blobs.iter().map(|b| b.bytes.len() as u64).sum();
        let verify = if verify {
            Some(self.verify_blobs(&blobs)?)
        } else {
            None
        };

        info!(
            "Carrier written to {} ({} I-frames, {} hidden bytes)",
            carrier.display(),
            stats.iframes,
            hidden_bytes
        );

        Ok(EncodeReport {
            carrier,
            plain_stream,
            intermediate: scratch.keeps().then_some(intermediate),
            source_frames,
            stats,
            blobs: blobs.len(),
            hidden_bytes,
            verify,
        })
    }

    /// Regenerate every blob through the single-frame path decode uses
    fn verify_blobs(&self, blobs: &[FrameBlob]) -> Result<VerifyReport> {
        let mut regenerator = SingleFrameEncoder::new(self.transcoder.clone(), self.backend)?;
        let mut report = VerifyReport {
            images: 0,
            hidden_bytes: 0,
            restored_bytes: 0,
        };
        for blob in blobs {
            let image = self.codec.unpack(&blob.bytes)?;
            let restored = regenerator.regenerate(&image, &self.settings)?;
            report.images += 1;
            report.hidden_bytes += blob.bytes.len() as u64;
            report.restored_bytes += restored.len() as u64;
        }
        info!(
            "Verified {} images: {} hidden bytes, {} bytes of restored I-frames",
            report.images, report.hidden_bytes, report.restored_bytes
        );
        Ok(report)
    }

    /// Restore a playable `<stem>.mp4` from a carrier stream
    pub fn decode(&self, input: &Path) -> Result<DecodeReport> {
        require_file(input)?;

        let dir = parent_dir(input);
        let mut scratch = ScratchFiles::new(self.keep_intermediates);
        let recovered = scratch.track(available_path(&with_stem_suffix(
            &stem_path(input, "264"),
            "_dec",
        )));
        let output = available_path(&stem_path(input, "mp4"));

        info!("Decoding {} with {}", input.display(), self.backend);

        let regenerator = SingleFrameEncoder::new(self.transcoder.clone(), self.backend)?;
        let mut engine = RecoveryEngine::new(&self.backend, &self.codec, regenerator);
        let stats = engine.recover(input, &recovered)?;

        let staged = tempfile::Builder::new()
            .prefix(".iframe-carrier-")
            .suffix(".mp4")
            .tempfile_in(&dir)?;
        self.transcoder
            .transcode(&recovered, staged.path(), &self.settings, None)?;
        staged
            .persist_noclobber(&output)
            .map_err(|e| CarrierError::IoError(e.error))?;

        info!("Recovered video written to {}", output.display());
        Ok(DecodeReport {
            output,
            recovered_stream: scratch.keeps().then_some(recovered),
            stats,
        })
    }

    /// Save every hidden image as `frame_<index>.png` in `out_dir`
    pub fn extract(&self, input: &Path, out_dir: &Path) -> Result<ExtractReport> {
        require_file(input)?;
        std::fs::create_dir_all(out_dir)?;

        let mut stream = self.backend.open(input, None)?;
        let mut stats = StreamStats::default();
        let mut frames = Vec::new();

        while stream.advance()? == Advance::Unit {
            let unit_type = stream.unit_type()?;
            if unit_type == NAL_TYPE_IDR {
                let hidden = read_unit_payload(stream.as_ref())?;
                let (header, blob) = parse_payload(&hidden)?;
                let image = self.codec.unpack(blob)?;
                let index = stats.iframes * u64::from(header.interval);
                let path = available_path(&out_dir.join(format!("frame_{index:06}.png")));
                image.save_with_format(&path, image::ImageFormat::Png)?;
                frames.push(path);
            }
            stats.record(unit_type);
        }
        stream.close()?;

        info!(
            "Extracted {} images from {} into {}",
            frames.len(),
            input.display(),
            out_dir.display()
        );
        Ok(ExtractReport { frames, stats })
    }

    /// Count NAL units by type and recognise carrier payloads
    pub fn inspect(&self, input: &Path) -> Result<StreamReport> {
        inspect_stream(&self.backend, input)
    }
}

/// Read-only scan of an elementary stream
pub fn inspect_stream(backend: &dyn NalBackend, input: &Path) -> Result<StreamReport> {
    require_file(input)?;
    let size = std::fs::metadata(input)?.len();

    let mut stream = backend.open(input, None)?;
    let mut report = StreamReport {
        path: input.to_path_buf(),
        size,
        stats: StreamStats::default(),
        unit_types: BTreeMap::new(),
        carrier_payloads: 0,
        hidden_bytes: 0,
    };

    while stream.advance()? == Advance::Unit {
        let unit_type = stream.unit_type()?;
        if unit_type == NAL_TYPE_IDR {
            let payload = read_unit_payload(stream.as_ref())?;
            if is_carrier_payload(&payload) {
                report.carrier_payloads += 1;
                report.hidden_bytes += payload.len() as u64;
            }
        }
        *report
            .unit_types
            .entry(NalUnitType::from(unit_type).label())
            .or_insert(0) += 1;
        report.stats.record(unit_type);
    }
    stream.close()?;
    Ok(report)
}
