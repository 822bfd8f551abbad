//! Partitions and addresses
//!
//! A partition is one independently replicated state-machine group. The
//! client only needs its ID and one reachable [`Address`].
//!
//! Partition configuration may arrive out of order. [`sort_partitions`]
//! builds the client's own ascending working copy and never touches the
//! caller's list.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Identifier of a partition, positive and unique within a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartitionId(u32);

impl PartitionId {
    /// Create a partition ID, rejecting zero
    pub fn new(id: u32) -> Result<Self> {
        if id == 0 {
            return Err(Error::invalid_config("partition ID must be positive"));
        }
        Ok(Self(id))
    }

    /// Raw numeric value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque `host:port` network endpoint of a replica group
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Build an address from host and port
    pub fn new(host: &str, port: u16) -> Self {
        Self(format!("{}:{}", host, port))
    }

    /// The address as `host:port`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One replica endpoint as it appears in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Host name or IP
    pub host: String,
    /// Port number
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Partition description as delivered by configuration or discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Partition ID
    pub partition_id: u32,
    /// Replica endpoints; the first one is used
    pub endpoints: Vec<Endpoint>,
}

impl PartitionConfig {
    /// Create a partition config with a single endpoint
    pub fn new(partition_id: u32, host: impl Into<String>, port: u16) -> Self {
        Self {
            partition_id,
            endpoints: vec![Endpoint::new(host, port)],
        }
    }
}

/// A partition ID paired with the address used to reach it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Partition {
    /// Partition ID
    pub id: PartitionId,
    /// Serving address
    pub address: Address,
}

impl Partition {
    /// Create a partition
    pub fn new(id: PartitionId, address: Address) -> Self {
        Self { id, address }
    }

    /// Build from configuration, using the first endpoint
    pub fn from_config(config: &PartitionConfig) -> Result<Self> {
        let id = PartitionId::new(config.partition_id)?;
        let endpoint = config.endpoints.first().ok_or_else(|| {
            Error::invalid_config(format!("partition {} has no endpoints", id))
        })?;
        Ok(Self {
            id,
            address: Address::new(&endpoint.host, endpoint.port),
        })
    }
}

/// Build the ascending-by-ID partition list from (possibly unordered) config
///
/// Rejects zero or duplicate IDs and partitions without endpoints.
pub fn sort_partitions(configs: &[PartitionConfig]) -> Result<Vec<Partition>> {
    let mut partitions = configs
        .iter()
        .map(Partition::from_config)
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for p in &partitions {
        if !seen.insert(p.id) {
            return Err(Error::invalid_config(format!(
                "duplicate partition ID {}",
                p.id
            )));
        }
    }

    partitions.sort_by_key(|p| p.id);
    Ok(partitions)
}
