//! Encode command implementation

use super::{CodecArgs, EncoderArgs, StreamArgs};
use anyhow::{Context as _, Result};
use carrier_core::{Carrier, Config};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct EncodeCommand {
    /// Input video file
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Hide every Nth frame (also the keyframe interval)
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u32).range(1..))]
    interval: u32,

    #[command(flatten)]
    codec: CodecArgs,

    #[command(flatten)]
    encoder: EncoderArgs,

    #[command(flatten)]
    stream: StreamArgs,

    /// Regenerate every hidden image through the decode path and report sizes
    #[arg(long)]
    verify: bool,
}

impl EncodeCommand {
    pub fn execute(self, mut config: Config) -> Result<()> {
        self.codec.apply(&mut config);
        self.encoder.apply(&mut config);
        self.stream.apply(&mut config);

        let carrier = Carrier::from_config(&config)?;
        println!(
            "{} {} (every {} frames, {} + {})",
            "Encoding".green().bold(),
            self.input.display(),
            self.interval,
            carrier.codec().image_name(),
            carrier.codec().compression()
        );

        let report = carrier
            .encode(&self.input, self.interval, self.verify)
            .with_context(|| format!("Failed to encode {}", self.input.display()))?;

        println!(
            "  I-frames:      {} of {} frames ({} NAL units)",
            report.stats.iframes, report.stats.frames, report.stats.total
        );
        println!("  Source frames: {}", report.source_frames);
        println!("  Hidden bytes:  {}", report.hidden_bytes);
        println!("  Plain stream:  {}", report.plain_stream.display());
        if let Some(intermediate) = &report.intermediate {
            println!("  Intermediate:  {}", intermediate.display());
        }
        if let Some(verify) = &report.verify {
            println!(
                "  Verified:      {} images, {} hidden bytes restore to {} bytes",
                verify.images, verify.hidden_bytes, verify.restored_bytes
            );
        }
        println!(
            "{} {}",
            "Carrier written:".green().bold(),
            report.carrier.display()
        );
        Ok(())
    }
}
