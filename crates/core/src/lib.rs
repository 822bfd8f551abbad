//! Core types for the Strata partition client
//!
//! This crate defines the foundational types shared by every layer:
//! - Name / PrimitiveId: cluster-wide identity of a primitive instance
//! - PrimitiveType: discriminates the ten primitive kinds
//! - PartitionId / Address / Partition: where a replica group lives
//! - RequestHeader / ResponseHeader / ResponseStatus: per-RPC correlation metadata
//! - Error: the client error taxonomy
//! - ClientConfig: TOML configuration for sessions, retries and partitions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod headers;
pub mod name;
pub mod partition;
pub mod primitive_type;

pub use config::{
    ClientConfig, DatabaseSection, RetrySection, SessionSection, CONFIG_FILE_NAME,
};
pub use error::{Error, Result};
pub use headers::{
    RequestHeader, ResponseHeader, ResponseStatus, ServerError, SessionId,
};
pub use name::{Name, PrimitiveId};
pub use partition::{sort_partitions, Address, Endpoint, Partition, PartitionConfig, PartitionId};
pub use primitive_type::PrimitiveType;
