//! The `iris serve` command for running the classification server.

use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use iris_core::{Classifier, ClipScorer, Config, Dispatcher, Server};

/// Arguments for the `serve` command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Bind host (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Bind port (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory containing downloaded models (overrides config)
    #[arg(long)]
    pub model_dir: Option<PathBuf>,
}

/// Execute the serve command.
///
/// Loads the CLIP sessions up front so a missing or broken model fails
/// here rather than on the first request, then runs the accept loop
/// until the process is terminated.
pub async fn execute(args: ServeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(model_dir) = args.model_dir {
        config.general.model_dir = model_dir;
    }

    let model_dir = config.model_files_dir();
    if !ClipScorer::model_exists(&model_dir) {
        anyhow::bail!(
            "Model files not found in {}.\nRun `iris models download` first.",
            model_dir.display()
        );
    }

    tracing::info!("Loading CLIP model from {}", model_dir.display());
    let image_size = config.model.image_size;
    let context_length = config.model.context_length;
    // Session construction reads hundreds of MB from disk; keep it off
    // the async runtime.
    let scorer = tokio::task::spawn_blocking(move || {
        ClipScorer::load(&model_dir, image_size, context_length)
    })
    .await??;

    let classifier = Classifier::new(Arc::new(scorer), config.model.max_image_dimension);
    let dispatcher = Dispatcher::new(classifier);

    let server = Server::bind(config.server, dispatcher).await?;
    server.run().await?;
    Ok(())
}
