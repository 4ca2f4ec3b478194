//! add_dir command handler.
//!
//! Indexes every recognized image in a directory into the workspace index.

use clap::Args;
use ris_core::{config::AppConfig, AppResult};
use ris_engine::{ProgressEvent, ProgressReporter};
use std::path::PathBuf;
use std::sync::Arc;

/// Index the images in a directory
#[derive(Args, Debug)]
pub struct AddDirCommand {
    /// Directory containing the images
    pub directory: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Print progress lines to stderr
    #[arg(long)]
    pub progress: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AddDirCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing add_dir command for {:?}", self.directory);

        if !self.json {
            println!("Indexing images in {}", self.directory.display());
        }

        let progress = if self.progress {
            ProgressReporter::new(Arc::new(|event: ProgressEvent| {
                eprintln!("{}", event.format_simple());
            }))
        } else {
            ProgressReporter::noop()
        };

        let summary =
            ris_engine::add_directory(config, &self.directory, self.recursive, &progress).await?;

        if self.json {
            let output = serde_json::json!({
                "directory": self.directory,
                "count": summary.count,
                "skipped": summary.skipped,
                "duplicates": summary.duplicates,
                "durationSecs": summary.duration_secs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} images ({} skipped, {} duplicates) in {:.2}s",
                summary.count, summary.skipped, summary.duplicates, summary.duration_secs
            );
            println!("Finished indexing.");
        }

        Ok(())
    }
}
