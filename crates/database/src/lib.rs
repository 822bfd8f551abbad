//! Database: the partition set of one logical database
//!
//! A [`Database`] owns one [`Session`](strata_session::Session) per
//! partition and hands out primitive clients bound to that session list.
//! It is the only owner that closes sessions.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod client;
pub mod database;

pub use builder::{DatabaseBuilder, DatabaseConfig};
pub use client::{
    CounterClient, ElectionClient, IndexedMapClient, LeaderLatchClient, ListClient, LockClient,
    LogClient, MapClient, SetClient, ValueClient,
};
pub use database::Database;
