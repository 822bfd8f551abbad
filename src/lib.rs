//! Strata client - sessions and distributed primitives over a partitioned
//! replicated-state-machine cluster
//!
//! # Quick Start
//!
//! ```ignore
//! use strata_client::{ClientConfig, Database, TcpConnector, with_replay};
//!
//! let config = ClientConfig::from_file(Path::new("strata-client.toml"))?;
//! let db = Database::from_config(&config, &TcpConnector::new()).await?;
//!
//! let set = db.get_set("members")?;
//! set.add("alice").await?;
//! let mut events = set.watch(&[with_replay()]).await?;
//!
//! db.close().await?;
//! ```
//!
//! # Architecture
//!
//! - [`Session`]: exactly-once commands, read-your-writes queries and
//!   server streams against one partition
//! - [`Primitive`]: binds a primitive name to the database's sessions and
//!   routes it to one partition
//! - [`Database`]: opens one session per partition and hands out clients
//!
//! The layers are separate crates; this crate re-exports their public API.

pub use strata_core::{
    Address, ClientConfig, DatabaseSection, Endpoint, Error, Name, Partition, PartitionConfig,
    PartitionId, PrimitiveId, PrimitiveType, Result, RetrySection, SessionId, SessionSection,
    CONFIG_FILE_NAME,
};
pub use strata_database::{
    CounterClient, Database, DatabaseBuilder, DatabaseConfig, ElectionClient, IndexedMapClient,
    LeaderLatchClient, ListClient, LockClient, LogClient, MapClient, SetClient, ValueClient,
};
pub use strata_primitives::*;
pub use strata_session::{
    Connector, ResponseStream, RetryPolicy, Session, SessionConfig, TcpConnector, TcpTransport,
    Transport,
};

/// Wire messages and per-primitive operation schemas
pub mod protocol {
    pub use strata_protocol::*;
}
