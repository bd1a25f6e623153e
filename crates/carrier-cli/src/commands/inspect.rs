//! Inspect command implementation

use anyhow::{Context as _, Result};
use carrier_core::{inspect_stream, Config};
use carrier_nal::Backend;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

#[derive(Args)]
pub struct InspectCommand {
    /// Elementary stream (.264 or .lrc)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// NAL walker: streaming or buffered
    #[arg(long)]
    backend: Option<Backend>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl InspectCommand {
    pub fn execute(self, mut config: Config) -> Result<()> {
        if let Some(backend) = self.backend {
            config.stream_mut().backend = Some(backend);
        }

        let report = inspect_stream(&config.backend(), &self.input)
            .with_context(|| format!("Failed to inspect {}", self.input.display()))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{} {}", "Stream".green().bold(), report.path.display());
        println!("  Size:              {} bytes", report.size);
        println!("  NAL units:         {}", report.stats.total);
        println!("  Frames:            {}", report.stats.frames);
        println!("  I-frames:          {}", report.stats.iframes);
        println!(
            "  Carrier payloads:  {} ({} bytes)",
            report.carrier_payloads, report.hidden_bytes
        );
        println!("  Unit types:");
        for (label, count) in &report.unit_types {
            println!("    {label:<12} {count}");
        }
        Ok(())
    }
}
