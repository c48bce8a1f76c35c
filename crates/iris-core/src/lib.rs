//! Iris Core - Embeddable zero-shot image classification library.
//!
//! Iris classifies an image against per-category candidate labels using a
//! CLIP-style vision-language model, and serves that operation over a
//! newline-delimited JSON-RPC 2.0 TCP protocol.
//!
//! # Architecture
//!
//! ```text
//! Socket line → Dispatcher → Classifier → Scorer (CLIP) → ranked results → Socket line
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use iris_core::{ClipScorer, Classifier, Config, Dispatcher, Server};
//!
//! #[tokio::main]
//! async fn main() -> iris_core::Result<()> {
//!     let config = Config::load()?;
//!     let scorer = Arc::new(ClipScorer::load(
//!         &config.model_files_dir(),
//!         config.model.image_size,
//!         config.model.context_length,
//!     )?);
//!     let classifier = Classifier::new(scorer, config.model.max_image_dimension);
//!     let server = Server::bind(config.server.clone(), Dispatcher::new(classifier)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod classify;
pub mod config;
pub mod error;
pub mod math;
pub mod rpc;
pub mod scorer;
pub mod server;
pub mod types;

// Re-exports for convenient access
pub use classify::Classifier;
pub use config::Config;
pub use error::{ClassifyError, ConfigError, IrisError, Result, ScoreError, ServeError};
pub use rpc::Dispatcher;
pub use scorer::{ClipScorer, LabelScorer};
pub use server::Server;
pub use types::{CategoryResult, ClassifyParams, LabelScore};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
