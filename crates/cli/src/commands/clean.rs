//! clean command handler.

use clap::Args;
use ris_core::{config::AppConfig, AppResult};

/// Delete every document from the index
#[derive(Args, Debug)]
pub struct CleanCommand {}

impl CleanCommand {
    pub fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing clean command");

        ris_engine::clean(config)?;

        println!("Index cleaned: {}", config.index_path().display());

        Ok(())
    }
}
