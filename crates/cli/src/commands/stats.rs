//! stats command handler.

use clap::Args;
use ris_core::{config::AppConfig, AppResult};

/// Show index statistics
#[derive(Args, Debug)]
pub struct StatsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing stats command");

        let stats = ris_engine::stats(config)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
            return Ok(());
        }

        println!("Index: {}", config.index_path().display());
        println!("Documents: {}", stats.documents);
        println!(
            "Extractor: {}",
            stats.extractor.as_deref().unwrap_or("(none)")
        );
        println!("Size: {} bytes", stats.db_size_bytes);
        match stats.last_indexed_at {
            Some(at) => println!("Last indexed: {}", at.to_rfc3339()),
            None => println!("Last indexed: never"),
        }

        Ok(())
    }
}
