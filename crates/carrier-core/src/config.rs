//! Configuration loading for iframe-carrier.

use carrier_codec::{Compression, FrameCodec, ImageKind, DEFAULT_JPEG_QUALITY};
use carrier_common::{CarrierError, Result};
use carrier_nal::Backend;
use carrier_transcode::{EncoderSettings, Transcoder, X264Preset};
use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    pub transcode: Option<TranscodeConfig>,
    pub codec: Option<CodecConfig>,
    pub stream: Option<StreamConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct TranscodeConfig {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub preset: Option<X264Preset>,
    pub crf: Option<u8>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct CodecConfig {
    pub image: Option<ImageKind>,
    pub jpeg_quality: Option<u8>,
    pub compression: Option<Compression>,
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct StreamConfig {
    pub backend: Option<Backend>,
    pub keep_intermediates: Option<bool>,
}

impl Config {
    pub fn transcode_mut(&mut self) -> &mut TranscodeConfig {
        self.transcode.get_or_insert_with(Default::default)
    }

    pub fn codec_mut(&mut self) -> &mut CodecConfig {
        self.codec.get_or_insert_with(Default::default)
    }

    pub fn stream_mut(&mut self) -> &mut StreamConfig {
        self.stream.get_or_insert_with(Default::default)
    }

    pub fn transcoder(&self) -> Transcoder {
        let transcode = self.transcode.as_ref();
        let ffmpeg = transcode
            .and_then(|t| t.ffmpeg.clone())
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        let ffprobe = transcode
            .and_then(|t| t.ffprobe.clone())
            .unwrap_or_else(|| PathBuf::from("ffprobe"));
        Transcoder::new(ffmpeg, ffprobe)
    }

    /// Encoder settings; preset "medium" and CRF 23 unless configured
    pub fn encoder_settings(&self) -> Result<EncoderSettings> {
        let defaults = EncoderSettings::default();
        let transcode = self.transcode.as_ref();
        let preset = transcode.and_then(|t| t.preset).unwrap_or(defaults.preset);
        let crf = transcode.and_then(|t| t.crf).unwrap_or(defaults.crf);
        Ok(EncoderSettings::new(preset, crf)?)
    }

    pub fn frame_codec(&self) -> Result<FrameCodec> {
        let codec = self.codec.as_ref();
        let kind = codec.and_then(|c| c.image).unwrap_or_default();
        let quality = codec
            .and_then(|c| c.jpeg_quality)
            .unwrap_or(DEFAULT_JPEG_QUALITY);
        let compression = codec.and_then(|c| c.compression).unwrap_or_default();
        Ok(FrameCodec::new(kind.build(quality)?, compression))
    }

    pub fn backend(&self) -> Backend {
        self.stream
            .as_ref()
            .and_then(|s| s.backend)
            .unwrap_or_default()
    }

    pub fn keep_intermediates(&self) -> bool {
        self.stream
            .as_ref()
            .and_then(|s| s.keep_intermediates)
            .unwrap_or(false)
    }
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "iframe-carrier").ok_or_else(|| {
        CarrierError::InvalidConfig("Could not determine config directory".to_string())
    })?;
    Ok(dirs.config_dir().join("config.toml"))
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)?;
    toml::from_str(&contents).map_err(|e| {
        CarrierError::InvalidConfig(format!(
            "Failed to parse config file {} as TOML: {e}",
            path.display()
        ))
    })
}
