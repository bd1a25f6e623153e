//! Extract command implementation

use super::CodecArgs;
use anyhow::{Context as _, Result};
use carrier_core::{Carrier, Config};
use carrier_nal::Backend;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct ExtractCommand {
    /// Carrier stream (.lrc)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Directory for the extracted frame_<index>.png files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    #[command(flatten)]
    codec: CodecArgs,

    /// NAL walker: streaming or buffered
    #[arg(long)]
    backend: Option<Backend>,
}

impl ExtractCommand {
    pub fn execute(self, mut config: Config) -> Result<()> {
        self.codec.apply(&mut config);
        if let Some(backend) = self.backend {
            config.stream_mut().backend = Some(backend);
        }

        let carrier = Carrier::from_config(&config)?;
        let report = carrier
            .extract(&self.input, &self.output_dir)
            .with_context(|| format!("Failed to extract from {}", self.input.display()))?;

        for path in &report.frames {
            println!("  {}", path.display());
        }
        println!(
            "{} {} images into {}",
            "Extracted".green().bold(),
            report.frames.len(),
            self.output_dir.display()
        );
        Ok(())
    }
}
