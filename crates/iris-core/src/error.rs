//! Error types for the iris classification service.
//!
//! Errors are organized by layer: configuration, scoring, classification,
//! and connection handling. Classification failures carry the context a
//! client needs in the error message, since requests arrive as opaque
//! bytes with no file path to point at.

use thiserror::Error;

/// Top-level error type for iris operations.
#[derive(Error, Debug)]
pub enum IrisError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Classification request failures
    #[error("Classification error: {0}")]
    Classify(#[from] ClassifyError),

    /// Server / connection-handling errors
    #[error("Server error: {0}")]
    Serve(#[from] ServeError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Failures inside the scorer capability (model loading or inference).
#[derive(Error, Debug)]
pub enum ScoreError {
    /// Model files missing or unreadable
    #[error("Model error: {message}")]
    Model { message: String },

    /// Inference run failed
    #[error("Inference failed: {message}")]
    Inference { message: String },
}

/// Failures while classifying one request.
///
/// Every variant surfaces to the client as a JSON-RPC application error
/// (code -32000); none of them may take the process down.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Image bytes could not be decoded
    #[error("Image decode failed: {message}")]
    Decode { message: String },

    /// Image dimensions exceed the configured limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// The labels mapping was empty
    #[error("labels must contain at least one category")]
    NoCategories,

    /// A category carried no candidate labels
    #[error("category {category:?} has no labels")]
    EmptyCategory { category: String },

    /// The scorer capability failed
    #[error("Scoring failed: {0}")]
    Scoring(#[from] ScoreError),
}

/// Connection-scoped server failures.
///
/// These abort a single connection; the accept loop keeps running.
#[derive(Error, Debug)]
pub enum ServeError {
    /// Listener could not bind the configured address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    /// Socket read/write failed
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer stopped sending before a complete request arrived
    #[error("Read timed out after {timeout_ms}ms")]
    ReadTimeout { timeout_ms: u64 },

    /// Response could not be flushed in time
    #[error("Write timed out after {timeout_ms}ms")]
    WriteTimeout { timeout_ms: u64 },

    /// Request grew past the configured bound before a newline arrived
    #[error("Request exceeds maximum size of {max_bytes} bytes")]
    RequestTooLarge { max_bytes: usize },

    /// The dispatch task panicked or was cancelled
    #[error("Dispatch failed: {message}")]
    Dispatch { message: String },
}

/// Convenience type alias for iris results.
pub type Result<T> = std::result::Result<T, IrisError>;
