//! H.264 transcoding through the ffmpeg / ffprobe command-line tools
//!
//! Every call runs the tool to completion (or streams raw frames over a pipe)
//! and turns a spawn failure or non-zero exit into a [`TranscodeError`]
//! carrying ffmpeg's stderr.
//!
//! # Example
//! ```no_run
//! use carrier_transcode::{EncoderSettings, Transcoder, X264Preset};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transcoder = Transcoder::default();
//! let settings = EncoderSettings::new(X264Preset::Fast, 20)?;
//!
//! // Keyframe every 10 frames and nowhere else
//! transcoder.transcode(
//!     Path::new("input.mp4"),
//!     Path::new("aligned.264"),
//!     &settings,
//!     Some(10),
//! )?;
//! # Ok(())
//! # }
//! ```

mod frames;
mod probe;

pub use frames::{FrameSink, RawFrameReader, RawFrameWriter};
pub use probe::VideoInfo;

use carrier_common::CarrierError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// Errors specific to transcoding
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("ffmpeg execution failed: {0}")]
    FfmpegError(String),

    #[error("ffprobe failed: {0}")]
    ProbeError(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<TranscodeError> for CarrierError {
    fn from(err: TranscodeError) -> Self {
        match err {
            TranscodeError::FfmpegError(msg) | TranscodeError::ProbeError(msg) => {
                CarrierError::FFmpegError(msg)
            }
            TranscodeError::FileNotFound(path) => CarrierError::FileNotFound(path),
            TranscodeError::InvalidConfig(msg) => CarrierError::InvalidConfig(msg),
            TranscodeError::IoError(e) => CarrierError::IoError(e),
        }
    }
}

/// x264 speed/quality presets, fastest first
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum X264Preset {
    Ultrafast,
    Superfast,
    Veryfast,
    Faster,
    Fast,
    #[default]
    Medium,
    Slow,
    Slower,
    Veryslow,
    Placebo,
}

impl X264Preset {
    pub const ALL: [X264Preset; 10] = [
        X264Preset::Ultrafast,
        X264Preset::Superfast,
        X264Preset::Veryfast,
        X264Preset::Faster,
        X264Preset::Fast,
        X264Preset::Medium,
        X264Preset::Slow,
        X264Preset::Slower,
        X264Preset::Veryslow,
        X264Preset::Placebo,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            X264Preset::Ultrafast => "ultrafast",
            X264Preset::Superfast => "superfast",
            X264Preset::Veryfast => "veryfast",
            X264Preset::Faster => "faster",
            X264Preset::Fast => "fast",
            X264Preset::Medium => "medium",
            X264Preset::Slow => "slow",
            X264Preset::Slower => "slower",
            X264Preset::Veryslow => "veryslow",
            X264Preset::Placebo => "placebo",
        }
    }

    /// Position in [`X264Preset::ALL`], as stored in a carrier payload
    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }
}

impl std::fmt::Display for X264Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for X264Preset {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        Self::ALL
            .iter()
            .find(|p| p.as_str() == wanted)
            .copied()
            .ok_or_else(|| TranscodeError::InvalidConfig(format!("unknown x264 preset '{s}'")))
    }
}

/// Highest CRF accepted by 8-bit libx264
pub const MAX_CRF: u8 = 51;

/// Encoder settings shared by every libx264 invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    pub preset: X264Preset,
    /// Constant Rate Factor (lower = better, 0-51, 23 is the x264 default)
    pub crf: u8,
}

impl EncoderSettings {
    pub fn new(preset: X264Preset, crf: u8) -> Result<Self, TranscodeError> {
        if crf > MAX_CRF {
            return Err(TranscodeError::InvalidConfig(format!(
                "CRF {crf} out of range 0..={MAX_CRF}"
            )));
        }
        Ok(Self { preset, crf })
    }

    /// Settings of the first, lossless pass in front of every keyframe-aligned encode
    ///
    /// Encode writes its intermediate container with these, and the
    /// single-frame path writes its one-frame clip with them, so an I-frame
    /// goes through the same two passes on both sides.
    #[must_use]
    pub fn intermediate(self) -> Self {
        Self { crf: 0, ..self }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: X264Preset::Medium,
            crf: 23,
        }
    }
}

/// libx264 output arguments, with a fixed keyframe interval when given
#[must_use]
pub fn x264_args(settings: &EncoderSettings, keyframe_interval: Option<u32>) -> Vec<String> {
    let mut args = vec![
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        settings.preset.as_str().to_string(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
    ];
    if let Some(interval) = keyframe_interval {
        args.push("-x264opts".to_string());
        args.push(format!("keyint={interval}:min-keyint={interval}:no-scenecut"));
    }
    args
}

/// Handle on the ffmpeg / ffprobe executables
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl Transcoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    pub fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    pub fn ffprobe(&self) -> &Path {
        &self.ffprobe
    }

    /// Re-encode `input` to `output` with libx264
    ///
    /// The output format follows the extension (`.264` gives a raw Annex-B
    /// elementary stream). With `keyframe_interval`, I-frames land on every
    /// Nth frame and nowhere else.
    pub fn transcode(
        &self,
        input: &Path,
        output: &Path,
        settings: &EncoderSettings,
        keyframe_interval: Option<u32>,
    ) -> Result<(), TranscodeError> {
        if !input.exists() {
            return Err(TranscodeError::FileNotFound(input.display().to_string()));
        }
        if keyframe_interval == Some(0) {
            return Err(TranscodeError::InvalidConfig(
                "keyframe interval must be at least 1".to_string(),
            ));
        }

        debug!(
            "Transcoding {} -> {} (preset {}, crf {}, keyint {:?})",
            input.display(),
            output.display(),
            settings.preset,
            settings.crf,
            keyframe_interval
        );

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-v", "error", "-nostdin", "-i"])
            .arg(input)
            .args(["-map", "0:v:0", "-an"])
            .args(x264_args(settings, keyframe_interval))
            .arg(output);
        run(cmd)
    }

    /// Encode one still image into a one-frame clip
    pub fn encode_still(
        &self,
        image: &Path,
        output: &Path,
        settings: &EncoderSettings,
    ) -> Result<(), TranscodeError> {
        if !image.exists() {
            return Err(TranscodeError::FileNotFound(image.display().to_string()));
        }

        debug!("Encoding still {} -> {}", image.display(), output.display());

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args(["-y", "-v", "error", "-nostdin", "-i"])
            .arg(image)
            .args(["-frames:v", "1"])
            .args(x264_args(settings, None))
            .arg(output);
        run(cmd)
    }
}

/// Run a prepared command to completion
fn run(mut cmd: Command) -> Result<(), TranscodeError> {
    debug!("FFmpeg command: {:?}", cmd);

    let output = cmd
        .output()
        .map_err(|e| TranscodeError::FfmpegError(format!("Failed to execute ffmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TranscodeError::FfmpegError(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}
