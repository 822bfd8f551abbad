//! Database configuration and builder
//!
//! ```ignore
//! use strata_database::Database;
//! use strata_session::TcpConnector;
//!
//! // 1. From a config file
//! let config = ClientConfig::from_file(Path::new("strata-client.toml"))?;
//! let db = Database::from_config(&config, &TcpConnector::new()).await?;
//!
//! // 2. Builder
//! let db = Database::builder()
//!     .name("raft")
//!     .partition(PartitionConfig::new(1, "localhost", 5678))
//!     .open(&TcpConnector::new())
//!     .await?;
//! ```

use crate::database::Database;
use strata_core::{ClientConfig, DatabaseSection, PartitionConfig, Result};
use strata_session::{Connector, SessionConfig};

/// Identity and session settings of a database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Namespace, database name and scope primitives are created in
    pub identity: DatabaseSection,
    /// Settings of every partition session
    pub session: SessionConfig,
}

impl From<&ClientConfig> for DatabaseConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            identity: config.database.clone(),
            session: SessionConfig::from(config),
        }
    }
}

// ============================================================================
// Database Builder
// ============================================================================

/// Fluent construction of a [`Database`]
#[derive(Debug, Clone, Default)]
pub struct DatabaseBuilder {
    config: DatabaseConfig,
    partitions: Vec<PartitionConfig>,
}

impl DatabaseBuilder {
    /// Builder with default identity and session settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.identity.namespace = namespace.into();
        self
    }

    /// Set the database name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.identity.name = name.into();
        self
    }

    /// Set the application scope
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.config.identity.scope = scope.into();
        self
    }

    /// Use these session settings
    pub fn session(mut self, session: SessionConfig) -> Self {
        self.config.session = session;
        self
    }

    /// Add a partition (any order)
    pub fn partition(mut self, partition: PartitionConfig) -> Self {
        self.partitions.push(partition);
        self
    }

    /// Add several partitions (any order)
    pub fn partitions(mut self, partitions: impl IntoIterator<Item = PartitionConfig>) -> Self {
        self.partitions.extend(partitions);
        self
    }

    /// Open a session on every partition
    pub async fn open<C>(self, connector: &C) -> Result<Database>
    where
        C: Connector + Clone,
    {
        Database::open(self.config, &self.partitions, connector).await
    }
}
