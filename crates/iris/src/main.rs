//! Iris CLI - Zero-shot image classification service over TCP JSON-RPC.
//!
//! Iris serves a `classify` method: clients send an image plus candidate
//! labels grouped by category, and receive the best-matching label per
//! category with its score and ranked alternatives.
//!
//! # Usage
//!
//! ```bash
//! # Run the classification server
//! iris serve
//!
//! # Classify an image against a running server
//! iris classify photo.jpg --labels '{"animal":["cat","dog"]}'
//!
//! # View configuration
//! iris config show
//!
//! # Manage models
//! iris models download
//! ```

use clap::{Parser, Subcommand};

mod cli;
mod logging;

/// Iris - Zero-shot image classification service over TCP JSON-RPC.
#[derive(Parser, Debug)]
#[command(name = "iris")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the classification server
    Serve(cli::serve::ServeArgs),

    /// Send a classify request to a running server
    Classify(cli::classify::ClassifyArgs),

    /// Manage AI models (download, list, etc.)
    Models(cli::models::ModelsArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging from config, with CLI verbose override.
    // Note: logging isn't initialized yet, so use eprintln for config warnings.
    let config = match iris_core::Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `iris config path`."
            );
            iris_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Iris v{}", iris_core::VERSION);

    // Dispatch to the appropriate command handler
    match cli.command {
        Commands::Serve(args) => cli::serve::execute(args, config).await,
        Commands::Classify(args) => cli::classify::execute(args).await,
        Commands::Models(args) => cli::models::execute(args).await,
        Commands::Config(args) => cli::config::execute(args).await,
    }
}
