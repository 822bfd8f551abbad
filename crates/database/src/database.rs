//! Database: owns one session per partition
//!
//! Partitions are sorted by ascending ID before anything else happens, so
//! the session list (and every primitive's routing over it) does not depend
//! on the order configuration or discovery delivered them in.
//!
//! Opening is all-or-nothing: sessions are opened concurrently and, if any
//! fails, the ones that succeeded are closed again before the error is
//! returned.

use crate::builder::{DatabaseBuilder, DatabaseConfig};
use futures::future::join_all;
use std::sync::Arc;
use strata_core::{
    sort_partitions, ClientConfig, Error, Name, Partition, PartitionConfig, PartitionId,
    PrimitiveId, PrimitiveType, Result,
};
use strata_primitives::{
    Counter, Election, IndexedMap, LeaderLatch, List, Lock, Log, Map, Primitive, Set, Value,
};
use strata_session::{Connector, Session};
use tracing::{info, warn};

/// The partition set of one logical database and its primitive factory
pub struct Database {
    config: DatabaseConfig,
    partitions: Vec<Partition>,
    sessions: Vec<Arc<Session>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("identity", &self.config.identity)
            .field("partitions", &self.partition_ids())
            .finish()
    }
}

impl Database {
    /// Builder for programmatic configuration
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Open a session on every partition.
    ///
    /// `partitions` may be in any order; the caller's slice is left as is.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` for an empty, duplicate or malformed partition list
    /// - `PartitionUnavailable` naming the first partition (by ID) whose
    ///   session could not be opened; no session stays open in that case
    pub async fn open<C>(
        config: DatabaseConfig,
        partitions: &[PartitionConfig],
        connector: &C,
    ) -> Result<Self>
    where
        C: Connector + Clone,
    {
        let partitions = sort_partitions(partitions)?;
        if partitions.is_empty() {
            return Err(Error::invalid_config("a database needs at least one partition"));
        }

        let opens = partitions
            .iter()
            .map(|partition| Session::open(partition.clone(), connector, config.session.clone()));
        let results = join_all(opens).await;

        let mut sessions = Vec::with_capacity(partitions.len());
        let mut failure = None;
        for (partition, result) in partitions.iter().zip(results) {
            match result {
                Ok(session) => sessions.push(Arc::new(session)),
                Err(e) => {
                    warn!(
                        partition = partition.id.as_u32(),
                        error = %e,
                        "Partition session failed to open"
                    );
                    if failure.is_none() {
                        failure = Some(Error::partition_unavailable(partition.id.as_u32(), e));
                    }
                }
            }
        }

        if let Some(err) = failure {
            // Nothing may outlive a failed open
            for result in join_all(sessions.iter().map(|s| s.close())).await {
                if let Err(e) = result {
                    warn!(error = %e, "Session cleanup after failed open failed");
                }
            }
            return Err(err);
        }

        info!(
            namespace = %config.identity.namespace,
            database = %config.identity.name,
            partitions = partitions.len(),
            "Database opened"
        );
        Ok(Self {
            config,
            partitions,
            sessions,
        })
    }

    /// Open using a client config and its static partition list
    pub async fn from_config<C>(config: &ClientConfig, connector: &C) -> Result<Self>
    where
        C: Connector + Clone,
    {
        config.validate()?;
        Self::open(DatabaseConfig::from(config), &config.partitions, connector).await
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// Namespace primitives are created in
    pub fn namespace(&self) -> &str {
        &self.config.identity.namespace
    }

    /// Database name
    pub fn name(&self) -> &str {
        &self.config.identity.name
    }

    /// Application scope
    pub fn scope(&self) -> &str {
        &self.config.identity.scope
    }

    /// Partition IDs in ascending order
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        self.partitions.iter().map(|p| p.id).collect()
    }

    /// Partitions in ascending ID order
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Sessions in ascending partition order
    pub fn sessions(&self) -> &[Arc<Session>] {
        &self.sessions
    }

    /// Identity and session settings
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Primitive factories
    // ------------------------------------------------------------------------

    fn bind(&self, primitive_type: PrimitiveType, name: &str) -> Result<Primitive> {
        if name.is_empty() {
            return Err(Error::invalid_argument("primitive name must not be empty"));
        }
        let identity = &self.config.identity;
        let name = Name::new(
            identity.namespace.as_str(),
            identity.name.as_str(),
            identity.scope.as_str(),
            name,
        );
        Primitive::new(PrimitiveId::new(primitive_type, name), self.sessions.clone())
    }

    /// Counter client for `name`
    pub fn get_counter(&self, name: &str) -> Result<Counter> {
        Ok(Counter::new(self.bind(PrimitiveType::Counter, name)?))
    }

    /// Election client for `name`
    pub fn get_election(&self, name: &str) -> Result<Election> {
        Ok(Election::new(self.bind(PrimitiveType::Election, name)?))
    }

    /// Indexed map client for `name`
    pub fn get_indexed_map(&self, name: &str) -> Result<IndexedMap> {
        Ok(IndexedMap::new(self.bind(PrimitiveType::IndexedMap, name)?))
    }

    /// Leader latch client for `name`
    pub fn get_leader_latch(&self, name: &str) -> Result<LeaderLatch> {
        Ok(LeaderLatch::new(self.bind(PrimitiveType::LeaderLatch, name)?))
    }

    /// List client for `name`
    pub fn get_list(&self, name: &str) -> Result<List> {
        Ok(List::new(self.bind(PrimitiveType::List, name)?))
    }

    /// Lock client for `name`
    pub fn get_lock(&self, name: &str) -> Result<Lock> {
        Ok(Lock::new(self.bind(PrimitiveType::Lock, name)?))
    }

    /// Log client for `name`
    pub fn get_log(&self, name: &str) -> Result<Log> {
        Ok(Log::new(self.bind(PrimitiveType::Log, name)?))
    }

    /// Map client for `name`
    pub fn get_map(&self, name: &str) -> Result<Map> {
        Ok(Map::new(self.bind(PrimitiveType::Map, name)?))
    }

    /// Set client for `name`
    pub fn get_set(&self, name: &str) -> Result<Set> {
        Ok(Set::new(self.bind(PrimitiveType::Set, name)?))
    }

    /// Value client for `name`
    pub fn get_value(&self, name: &str) -> Result<Value> {
        Ok(Value::new(self.bind(PrimitiveType::Value, name)?))
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Close every session.
    ///
    /// Every close is attempted even if others fail.
    ///
    /// # Errors
    ///
    /// `CloseFailed` with the number of failures and the last failure in
    /// partition order.
    pub async fn close(&self) -> Result<()> {
        let results = join_all(self.sessions.iter().map(|s| s.close())).await;

        let mut failed = 0;
        let mut last = None;
        for (partition, result) in self.partitions.iter().zip(results) {
            if let Err(e) = result {
                warn!(
                    partition = partition.id.as_u32(),
                    error = %e,
                    "Partition session failed to close"
                );
                failed += 1;
                last = Some(e);
            }
        }

        match last {
            None => {
                info!(
                    namespace = %self.config.identity.namespace,
                    database = %self.config.identity.name,
                    "Database closed"
                );
                Ok(())
            }
            Some(source) => Err(Error::CloseFailed {
                failed,
                source: Box::new(source),
            }),
        }
    }
}
