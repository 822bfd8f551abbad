//! Client configuration via `strata-client.toml`
//!
//! Holds database identity, session timing, retry policy and an optional
//! static partition list. Every section has defaults, so an empty file is a
//! valid configuration.

use crate::error::{Error, Result};
use crate::partition::{sort_partitions, PartitionConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Conventional config file name.
pub const CONFIG_FILE_NAME: &str = "strata-client.toml";

/// Identity of the logical database primitives are created in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSection {
    /// Namespace (default: "default")
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Database name (default: "default")
    #[serde(default = "default_namespace")]
    pub name: String,
    /// Application scope (default: "default")
    #[serde(default = "default_namespace")]
    pub scope: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            name: default_namespace(),
            scope: default_namespace(),
        }
    }
}

/// Session timing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSection {
    /// Session timeout in milliseconds; keep-alives go out at half this
    #[serde(default = "default_session_timeout_ms")]
    pub timeout_ms: u64,
    /// Per-attempt wait for a response in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Capacity of each stream delivery channel
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
    /// Attempts at opening a session before giving up
    #[serde(default = "default_open_attempts")]
    pub open_attempts: usize,
}

fn default_session_timeout_ms() -> u64 {
    30_000
}

fn default_request_timeout_ms() -> u64 {
    5_000
}

fn default_stream_buffer() -> usize {
    64
}

fn default_open_attempts() -> usize {
    3
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timeout_ms: default_session_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            stream_buffer: default_stream_buffer(),
            open_attempts: default_open_attempts(),
        }
    }
}

/// Transport retry policy for resending requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySection {
    /// Maximum resends after the first attempt (0 = no retries)
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base delay between attempts in milliseconds (exponential backoff)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_retries() -> usize {
    3
}

fn default_base_delay_ms() -> u64 {
    10
}

fn default_max_delay_ms() -> u64 {
    1_000
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Client configuration loaded from `strata-client.toml`.
///
/// # Example
///
/// ```toml
/// [database]
/// namespace = "default"
/// name = "raft"
///
/// [session]
/// timeout_ms = 30000
///
/// [[partitions]]
/// partition_id = 1
/// endpoints = [{ host = "localhost", port = 5678 }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Database identity
    #[serde(default)]
    pub database: DatabaseSection,
    /// Session timing
    #[serde(default)]
    pub session: SessionSection,
    /// Retry policy
    #[serde(default)]
    pub retry: RetrySection,
    /// Static partition list (optional; usually supplied by discovery)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub partitions: Vec<PartitionConfig>,
}

impl ClientConfig {
    /// Validate value ranges and the partition list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.session.timeout_ms == 0 {
            return Err(Error::invalid_config("session.timeout_ms must be positive"));
        }
        if self.session.request_timeout_ms == 0 {
            return Err(Error::invalid_config(
                "session.request_timeout_ms must be positive",
            ));
        }
        if self.session.stream_buffer == 0 {
            return Err(Error::invalid_config("session.stream_buffer must be positive"));
        }
        if self.session.open_attempts == 0 {
            return Err(Error::invalid_config("session.open_attempts must be at least 1"));
        }
        sort_partitions(&self.partitions)?;
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Strata client configuration

[database]
namespace = "default"
name = "default"
scope = "default"

[session]
# Session timeout; keep-alives are sent every timeout / 2
timeout_ms = 30000
# How long each attempt waits for a response
request_timeout_ms = 5000
# Capacity of each stream delivery channel
stream_buffer = 64
# Attempts at opening a session
open_attempts = 3

[retry]
# Resends of a request after a transport failure (same sequence number)
max_retries = 3
base_delay_ms = 10
max_delay_ms = 1000

# [[partitions]]
# partition_id = 1
# endpoints = [{ host = "localhost", port = 5678 }]
"#
    }

    /// Parse and validate config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ClientConfig = toml::from_str(content)
            .map_err(|e| Error::invalid_config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::invalid_config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::invalid_config(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::invalid_config(format!(
                "failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_parses_to_default() {
        let config = ClientConfig::from_toml_str(ClientConfig::default_toml()).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.session.timeout_ms, 30_000);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.database.scope, "default");
        assert!(config.partitions.is_empty());
    }

    #[test]
    fn parse_partitions() {
        let config = ClientConfig::from_toml_str(
            r#"
[[partitions]]
partition_id = 2
endpoints = [{ host = "b", port = 2 }]

[[partitions]]
partition_id = 1
endpoints = [{ host = "a", port = 1 }]
"#,
        )
        .unwrap();
        assert_eq!(config.partitions.len(), 2);
        assert_eq!(config.partitions[0].partition_id, 2);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::from_toml_str("[session]\ntimeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }

    #[test]
    fn duplicate_partition_is_rejected() {
        let err = ClientConfig::from_toml_str(
            r#"
[[partitions]]
partition_id = 1
endpoints = [{ host = "a", port = 1 }]

[[partitions]]
partition_id = 1
endpoints = [{ host = "b", port = 2 }]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut config = ClientConfig::default();
        config.database.name = "raft".to_string();
        config.session.request_timeout_ms = 250;
        config.partitions = vec![PartitionConfig::new(1, "localhost", 5678)];

        config.write_to_file(&path).unwrap();
        let loaded = ClientConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(ClientConfig::from_file(&path).is_err());
    }
}
