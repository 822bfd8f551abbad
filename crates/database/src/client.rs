//! Primitive capabilities of a database
//!
//! One trait per primitive type, so code can depend on exactly the
//! factories it uses. [`Database`] implements all of them.

use crate::database::Database;
use strata_core::Result;
use strata_primitives::{
    Counter, Election, IndexedMap, LeaderLatch, List, Lock, Log, Map, Set, Value,
};

/// Creates counter clients
pub trait CounterClient {
    /// Counter client for `name`
    fn get_counter(&self, name: &str) -> Result<Counter>;
}

/// Creates election clients
pub trait ElectionClient {
    /// Election client for `name`
    fn get_election(&self, name: &str) -> Result<Election>;
}

/// Creates indexed map clients
pub trait IndexedMapClient {
    /// Indexed map client for `name`
    fn get_indexed_map(&self, name: &str) -> Result<IndexedMap>;
}

/// Creates leader latch clients
pub trait LeaderLatchClient {
    /// Leader latch client for `name`
    fn get_leader_latch(&self, name: &str) -> Result<LeaderLatch>;
}

/// Creates list clients
pub trait ListClient {
    /// List client for `name`
    fn get_list(&self, name: &str) -> Result<List>;
}

/// Creates lock clients
pub trait LockClient {
    /// Lock client for `name`
    fn get_lock(&self, name: &str) -> Result<Lock>;
}

/// Creates log clients
pub trait LogClient {
    /// Log client for `name`
    fn get_log(&self, name: &str) -> Result<Log>;
}

/// Creates map clients
pub trait MapClient {
    /// Map client for `name`
    fn get_map(&self, name: &str) -> Result<Map>;
}

/// Creates set clients
pub trait SetClient {
    /// Set client for `name`
    fn get_set(&self, name: &str) -> Result<Set>;
}

/// Creates value clients
pub trait ValueClient {
    /// Value client for `name`
    fn get_value(&self, name: &str) -> Result<Value>;
}

macro_rules! delegate_client {
    ($($trait:ident :: $method:ident -> $client:ident),* $(,)?) => {
        $(
            impl $trait for Database {
                fn $method(&self, name: &str) -> Result<$client> {
                    Database::$method(self, name)
                }
            }
        )*
    };
}

delegate_client!(
    CounterClient::get_counter -> Counter,
    ElectionClient::get_election -> Election,
    IndexedMapClient::get_indexed_map -> IndexedMap,
    LeaderLatchClient::get_leader_latch -> LeaderLatch,
    ListClient::get_list -> List,
    LockClient::get_lock -> Lock,
    LogClient::get_log -> Log,
    MapClient::get_map -> Map,
    SetClient::get_set -> Set,
    ValueClient::get_value -> Value,
);

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_capabilities<T>()
    where
        T: CounterClient
            + ElectionClient
            + IndexedMapClient
            + LeaderLatchClient
            + ListClient
            + LockClient
            + LogClient
            + MapClient
            + SetClient
            + ValueClient,
    {
    }

    #[test]
    fn test_database_has_every_capability() {
        assert_capabilities::<Database>();
    }
}
