//! Client error types.

use std::path::PathBuf;
use tableflow_lifecycle::InvalidConfig;
use thiserror::Error;

/// Errors loading a [`ClientConfig`](crate::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file is not valid client configuration.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// The `[lifecycle]` values cannot be run with.
    #[error("Invalid lifecycle config: {0}")]
    Lifecycle(#[from] InvalidConfig),
}

/// Errors building a [`GatewayClient`](crate::GatewayClient).
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway URL is empty.
    #[error("Gateway URL must not be empty")]
    EmptyGatewayUrl,
}
