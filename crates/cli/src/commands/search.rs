//! search command handler.

use clap::Args;
use ris_core::{config::AppConfig, AppResult};
use ris_engine::QueryReport;
use std::path::PathBuf;

/// Search the index with an image or a directory of images
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Probe image, or a directory whose images are each used as a probe
    pub path: PathBuf,

    /// Number of hits per probe (default from config)
    #[arg(short = 'k', long)]
    pub max_hits: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let k = self.max_hits.unwrap_or(config.max_hits);
        tracing::info!("Executing search command for {:?} (top-{})", self.path, k);

        let report = ris_engine::search(config, &self.path, k).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else if report.is_empty() {
            println!("No images to search in {}", self.path.display());
        } else {
            print_report(&report);
        }

        Ok(())
    }
}

fn print_report(report: &QueryReport) {
    for probe in &report.probes {
        println!("Searching for file: {}", probe.probe.display());
        if let Some(error) = &probe.error {
            println!("  error: {}", error);
        }
        for hit in &probe.hits {
            println!("{}: {}", hit.score, hit.identifier);
        }
        println!();
    }
}
