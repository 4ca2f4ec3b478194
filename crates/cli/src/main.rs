//! Reverse image search CLI
//!
//! Main entry point for the `ris` command-line tool.
//! Indexes directories of images and searches the index with probe images.

mod commands;

use clap::builder::FalseyValueParser;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{AddDirCommand, CleanCommand, SearchCommand, StatsCommand};
use ris_core::{config::AppConfig, logging, AppResult, LogFormat};
use std::path::PathBuf;
use std::process::ExitCode;

/// Reverse image search - index images and find the closest matches
#[derive(Parser, Debug)]
#[command(name = "ris")]
#[command(about = "Reverse image search over a local index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "RIS_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "RIS_CONFIG")]
    config: Option<PathBuf>,

    /// Index directory, relative to the workspace
    #[arg(long, global = true, env = "RIS_INDEX_DIR")]
    index_dir: Option<String>,

    /// Number of concurrent extraction workers
    #[arg(long, global = true, env = "RIS_WORKERS")]
    workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Log line format (text, json)
    #[arg(long, global = true, env = "RIS_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output (any non-empty `NO_COLOR` other than `0`/`false` counts)
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    no_color: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Index the images in a directory
    #[command(name = "add_dir")]
    AddDir(AddDirCommand),

    /// Search the index with an image or a directory of images
    Search(SearchCommand),

    /// Show index statistics
    Stats(StatsCommand),

    /// Delete every document from the index
    Clean(CleanCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::AddDir(_) => "add_dir",
            Commands::Search(_) => "search",
            Commands::Stats(_) => "stats",
            Commands::Clean(_) => "clean",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage(e),
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Missing or unknown arguments print the usage and exit successfully.
///
/// A recognized option with a value it cannot accept is a failure, so a
/// misconfigured environment never turns a command into a silent no-op.
fn usage(error: clap::Error) -> ExitCode {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            ExitCode::SUCCESS
        }
        ErrorKind::InvalidValue | ErrorKind::ValueValidation => {
            let _ = error.print();
            ExitCode::FAILURE
        }
        _ => {
            let _ = error.print();
            println!();
            let _ = Cli::command().print_help();
            ExitCode::SUCCESS
        }
    }
}

async fn run(cli: Cli) -> AppResult<()> {
    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return Ok(());
    };

    // Workspace and config file decide where the config file is read from
    let config = AppConfig::load_from(cli.workspace, cli.config)?.with_overrides(
        cli.index_dir,
        cli.workers,
        cli.log_level,
        cli.log_format,
        cli.verbose,
        cli.no_color,
    );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::debug!("Workspace: {:?}", config.workspace);
    if let Some(path) = &config.config_file {
        tracing::debug!("Merged config file {:?}", path);
    }
    tracing::debug!("Index: {:?}", config.index_path());
    tracing::debug!(
        "Extractor: {}, metric: {}, workers: {}",
        config.extractor,
        config.metric,
        config.workers
    );

    let _span = tracing::info_span!("command", name = command.name()).entered();

    let result = match command {
        Commands::AddDir(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Stats(cmd) => cmd.execute(&config),
        Commands::Clean(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::debug!("Command completed successfully"),
        Err(e) => tracing::debug!("Command failed: {}", e),
    }

    result
}
