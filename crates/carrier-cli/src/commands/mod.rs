pub mod decode;
pub mod encode;
pub mod extract;
pub mod inspect;

use anyhow::{Context as _, Result};
use carrier_codec::{Compression, ImageKind};
use carrier_core::{default_config_path, load_config, Config};
use carrier_nal::Backend;
use carrier_transcode::X264Preset;
use clap::Args;
use std::path::Path;

/// Load `--config`, or the default config file when present
pub fn load(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file does not exist: {}", path.display());
            }
            load_config(path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => {
            let path = default_config_path()?;
            load_config(&path).with_context(|| format!("Failed to load {}", path.display()))
        }
    }
}

/// How hidden frames are encoded
#[derive(Args, Debug, Default)]
pub struct CodecArgs {
    /// Still-image codec: png (lossless) or jpeg
    #[arg(long, value_name = "CODEC")]
    image: Option<ImageKind>,

    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,

    /// Compression of the encoded image: deflate, bzip2, xz or none
    #[arg(long, value_name = "METHOD")]
    compression: Option<Compression>,
}

impl CodecArgs {
    pub fn apply(&self, config: &mut Config) {
        let codec = config.codec_mut();
        if let Some(image) = self.image {
            codec.image = Some(image);
        }
        if let Some(quality) = self.quality {
            codec.jpeg_quality = Some(quality);
        }
        if let Some(compression) = self.compression {
            codec.compression = Some(compression);
        }
    }
}

/// x264 settings
#[derive(Args, Debug, Default)]
pub struct EncoderArgs {
    /// x264 preset (ultrafast .. placebo)
    #[arg(long)]
    preset: Option<X264Preset>,

    /// x264 constant rate factor
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=51))]
    crf: Option<u8>,
}

impl EncoderArgs {
    pub fn apply(&self, config: &mut Config) {
        let transcode = config.transcode_mut();
        if let Some(preset) = self.preset {
            transcode.preset = Some(preset);
        }
        if let Some(crf) = self.crf {
            transcode.crf = Some(crf);
        }
    }
}

/// NAL walker and intermediate file handling
#[derive(Args, Debug, Default)]
pub struct StreamArgs {
    /// NAL walker: streaming or buffered
    #[arg(long)]
    backend: Option<Backend>,

    /// Keep intermediate containers and streams
    #[arg(long)]
    keep_intermediates: bool,
}

impl StreamArgs {
    pub fn apply(&self, config: &mut Config) {
        let stream = config.stream_mut();
        if let Some(backend) = self.backend {
            stream.backend = Some(backend);
        }
        if self.keep_intermediates {
            stream.keep_intermediates = Some(true);
        }
    }
}
