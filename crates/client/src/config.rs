//! Client configuration file.
//!
//! ```toml
//! gateway_url = "https://testnets.tableland.network"
//! request_timeout = "10s"
//!
//! [lifecycle]
//! poll_interval = "1500ms"
//! max_consecutive_poll_errors = 20
//! provisioning_timeout = "2m"     # or "none" to wait forever
//! refresh_limit = 100
//! ```

use crate::ConfigError;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;
use tableflow_lifecycle::LifecycleConfig;

/// Configuration for the gateway client and the lifecycle it drives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the validator REST gateway.
    pub gateway_url: String,

    /// Per-request timeout for gateway calls.
    #[serde(deserialize_with = "duration")]
    pub request_timeout: Duration,

    /// Poll cadence, error budget and provisioning bound.
    pub lifecycle: LifecycleSection,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            gateway_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            lifecycle: LifecycleSection::default(),
        }
    }
}

impl ClientConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse from TOML text and validate the lifecycle section.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.lifecycle_config().validate()?;
        Ok(config)
    }

    /// Override the gateway URL.
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.lifecycle.poll_interval = interval;
        self
    }

    /// The lifecycle configuration described by this file.
    pub fn lifecycle_config(&self) -> LifecycleConfig {
        self.lifecycle.clone().into()
    }
}

/// The `[lifecycle]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleSection {
    #[serde(deserialize_with = "duration")]
    pub poll_interval: Duration,
    pub max_consecutive_poll_errors: Option<u32>,
    #[serde(deserialize_with = "optional_duration")]
    pub provisioning_timeout: Option<Duration>,
    pub refresh_limit: Option<u32>,
}

impl Default for LifecycleSection {
    fn default() -> Self {
        let defaults = LifecycleConfig::default();
        Self {
            poll_interval: defaults.poll_interval,
            max_consecutive_poll_errors: defaults.max_consecutive_poll_errors,
            provisioning_timeout: defaults.provisioning_timeout,
            refresh_limit: defaults.refresh_limit,
        }
    }
}

impl From<LifecycleSection> for LifecycleConfig {
    fn from(section: LifecycleSection) -> Self {
        LifecycleConfig {
            poll_interval: section.poll_interval,
            max_consecutive_poll_errors: section.max_consecutive_poll_errors,
            provisioning_timeout: section.provisioning_timeout,
            refresh_limit: section.refresh_limit,
        }
    }
}

/// Durations are written the `humantime` way: "1500ms", "2m", "1h 30m".
fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

/// Like [`duration`], with "none" meaning no bound.
fn optional_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    if text.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    humantime::parse_duration(&text)
        .map(Some)
        .map_err(serde::de::Error::custom)
}
