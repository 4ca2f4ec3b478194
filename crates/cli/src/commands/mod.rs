//! Command handlers for the `ris` CLI.

pub mod add_dir;
pub mod clean;
pub mod search;
pub mod stats;

pub use add_dir::AddDirCommand;
pub use clean::CleanCommand;
pub use search::SearchCommand;
pub use stats::StatsCommand;
