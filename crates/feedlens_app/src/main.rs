//! `feedlens`: classifies feed posts against user labels and paints the verdicts.
//!
//! ## Commands
//!
//! - `run`: observe one or more saved feed pages (optionally watching the last one)
//! - `labels`: list, add or remove the labels posts are classified against

mod platform;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use platform::config::{AppConfig, DEFAULT_CONFIG_FILENAME};
use platform::logging::LogDestination;

#[derive(Parser)]
#[command(name = "feedlens")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Zero-shot classification of social feed posts", long_about = None)]
struct Cli {
    /// Configuration file (RON)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILENAME, env = "FEEDLENS_CONFIG")]
    config: PathBuf,

    /// Label store file; overrides the configured one
    #[arg(long, global = true, env = "FEEDLENS_STORE")]
    store: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where log lines go
    #[arg(long, global = true, value_enum, default_value_t = LogDestination::Terminal)]
    log_destination: LogDestination,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Observe saved feed pages; each file is one batch of feed items
    ///
    /// While running, stdin accepts `toggle <key>`, `revoke <key>` and `quit`.
    Run {
        /// Keep rescanning the last snapshot whenever it changes
        #[arg(long)]
        watch: bool,

        /// HTML snapshots of the feed, in order
        #[arg(required = true)]
        snapshots: Vec<PathBuf>,
    },

    /// Manage classification labels
    Labels {
        #[command(subcommand)]
        action: LabelAction,
    },
}

#[derive(Subcommand)]
enum LabelAction {
    /// Print the configured labels
    List,
    /// Add a label
    Add { label: String },
    /// Remove a label
    Remove { label: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    platform::logging::initialize(cli.log_destination, cli.verbose);

    let mut config = AppConfig::load(&cli.config);
    if let Some(store) = cli.store {
        config.store = store;
    }

    match cli.command {
        Commands::Run { watch, snapshots } => platform::app::run(config, snapshots, watch).await,
        Commands::Labels { action } => {
            let store = platform::labels::open_store(&config.store);
            let mut out = std::io::stdout().lock();
            match action {
                LabelAction::List => platform::labels::list(&store, &mut out),
                LabelAction::Add { label } => platform::labels::add(&store, &label, &mut out),
                LabelAction::Remove { label } => platform::labels::remove(&store, &label, &mut out),
            }
        }
    }
}
