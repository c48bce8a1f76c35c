//! Sub-configuration structs with defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory where models are stored
    pub model_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("~/.iris/models"),
        }
    }
}

/// TCP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to listen on
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Per-connection resource limits
    pub limits: ServerLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            limits: ServerLimits::default(),
        }
    }
}

impl ServerConfig {
    /// The bind address as `host:port`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Per-connection limits protecting the server from slow or hostile peers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerLimits {
    /// Timeout for each socket read in milliseconds
    pub read_timeout_ms: u64,

    /// Timeout for writing the response in milliseconds
    pub write_timeout_ms: u64,

    /// Maximum accepted request size in bytes.
    /// Requests are buffered whole, so this bounds per-connection memory.
    pub max_request_bytes: usize,

    /// Maximum connections served concurrently
    pub max_connections: usize,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            max_request_bytes: 16 * 1024 * 1024,
            max_connections: 64,
        }
    }
}

/// CLIP model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name (subdirectory under model_dir holding the ONNX export)
    pub name: String,

    /// Square input size the visual encoder expects
    pub image_size: u32,

    /// Token sequence length the text encoder expects
    pub context_length: usize,

    /// Reject images wider or taller than this before preprocessing
    pub max_image_dimension: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "clip-vit-base-patch32".to_string(),
            image_size: 224,
            context_length: 77,
            max_image_dimension: 10_000,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
