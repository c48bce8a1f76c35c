//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.is_empty() {
            return Err(ConfigError::ValidationError(
                "server.host must not be empty".into(),
            ));
        }
        if self.server.limits.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "server.limits.read_timeout_ms must be > 0".into(),
            ));
        }
        if self.server.limits.write_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "server.limits.write_timeout_ms must be > 0".into(),
            ));
        }
        if self.server.limits.max_request_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "server.limits.max_request_bytes must be > 0".into(),
            ));
        }
        if self.server.limits.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "server.limits.max_connections must be > 0".into(),
            ));
        }
        if self.model.image_size == 0 {
            return Err(ConfigError::ValidationError(
                "model.image_size must be > 0".into(),
            ));
        }
        if self.model.context_length == 0 {
            return Err(ConfigError::ValidationError(
                "model.context_length must be > 0".into(),
            ));
        }
        if self.model.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "model.max_image_dimension must be > 0".into(),
            ));
        }
        Ok(())
    }
}
