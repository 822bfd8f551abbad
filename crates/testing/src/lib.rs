//! Test support for the partition client
//!
//! Provides in-process partitions that speak the session protocol:
//! - [`Replica`]: one partition with sequenced apply, a response cache and
//!   watch delivery, backed by a state machine per primitive type
//! - [`TestCluster`]: a set of replicas plus a [`strata_session::Connector`]
//!   that reaches them without a network
//! - [`serve_tcp`]: exposes a replica on a TCP listener
//! - [`Faults`]: injected failures per replica

#![warn(clippy::all)]

pub mod cluster;
pub mod faults;
mod machine;
pub mod replica;
pub mod server;

pub use cluster::{LocalTransport, TestCluster, TestConnector};
pub use faults::Faults;
pub use replica::{Replica, GAP_TIMEOUT};
pub use server::serve_tcp;
