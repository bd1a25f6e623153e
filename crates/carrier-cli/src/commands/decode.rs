//! Decode command implementation

use super::{CodecArgs, EncoderArgs, StreamArgs};
use anyhow::{Context as _, Result};
use carrier_core::{Carrier, Config};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct DecodeCommand {
    /// Carrier stream (.lrc)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,

    /// Settings for the final container encode
    #[command(flatten)]
    encoder: EncoderArgs,

    #[command(flatten)]
    stream: StreamArgs,
}

impl DecodeCommand {
    pub fn execute(self, mut config: Config) -> Result<()> {
        self.codec.apply(&mut config);
        self.encoder.apply(&mut config);
        self.stream.apply(&mut config);

        let carrier = Carrier::from_config(&config)?;
        println!("{} {}", "Decoding".green().bold(), self.input.display());

        let report = carrier
            .decode(&self.input)
            .with_context(|| format!("Failed to decode {}", self.input.display()))?;

        println!(
            "  I-frames:      {} restored ({} frames, {} NAL units)",
            report.stats.iframes, report.stats.frames, report.stats.total
        );
        if let Some(recovered) = &report.recovered_stream {
            println!("  Recovered:     {}", recovered.display());
        }
        println!(
            "{} {}",
            "Video written:".green().bold(),
            report.output.display()
        );
        Ok(())
    }
}
