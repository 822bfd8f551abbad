//! Primitive type enumeration
//!
//! Every primitive instance reports which kind of primitive it is. The type
//! travels with each request so a partition can route it to the matching
//! state machine.
//!
//! ## The Ten Primitives
//!
//! | Primitive | Purpose |
//! |-----------|---------|
//! | Counter | Distributed 64-bit counter |
//! | Election | Leader election with terms and candidates |
//! | IndexedMap | Insertion-ordered map addressable by key or index |
//! | LeaderLatch | Single-leader latch among participants |
//! | List | Distributed ordered list |
//! | Lock | Distributed mutual-exclusion lock |
//! | Log | Append-only indexed log |
//! | Map | Versioned key-value map |
//! | Set | Distributed set of strings |
//! | Value | Single versioned value |

use serde::{Deserialize, Serialize};
use std::fmt;

/// The ten primitive types a partition can host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    /// Distributed counter
    Counter,
    /// Leader election
    Election,
    /// Insertion-ordered map
    IndexedMap,
    /// Leader latch
    LeaderLatch,
    /// Ordered list
    List,
    /// Mutual-exclusion lock
    Lock,
    /// Append-only log
    Log,
    /// Key-value map
    Map,
    /// Set of strings
    Set,
    /// Single value
    Value,
}

impl PrimitiveType {
    /// All primitive types (for iteration)
    pub const ALL: [PrimitiveType; 10] = [
        PrimitiveType::Counter,
        PrimitiveType::Election,
        PrimitiveType::IndexedMap,
        PrimitiveType::LeaderLatch,
        PrimitiveType::List,
        PrimitiveType::Lock,
        PrimitiveType::Log,
        PrimitiveType::Map,
        PrimitiveType::Set,
        PrimitiveType::Value,
    ];

    /// Get all primitive types as a slice
    pub fn all() -> &'static [PrimitiveType] {
        &Self::ALL
    }

    /// Human-readable display name
    pub const fn name(&self) -> &'static str {
        match self {
            PrimitiveType::Counter => "Counter",
            PrimitiveType::Election => "Election",
            PrimitiveType::IndexedMap => "IndexedMap",
            PrimitiveType::LeaderLatch => "LeaderLatch",
            PrimitiveType::List => "List",
            PrimitiveType::Lock => "Lock",
            PrimitiveType::Log => "Log",
            PrimitiveType::Map => "Map",
            PrimitiveType::Set => "Set",
            PrimitiveType::Value => "Value",
        }
    }

    /// Short identifier used on the wire
    pub const fn id(&self) -> &'static str {
        match self {
            PrimitiveType::Counter => "counter",
            PrimitiveType::Election => "election",
            PrimitiveType::IndexedMap => "indexedmap",
            PrimitiveType::LeaderLatch => "leader",
            PrimitiveType::List => "list",
            PrimitiveType::Lock => "lock",
            PrimitiveType::Log => "log",
            PrimitiveType::Map => "map",
            PrimitiveType::Set => "set",
            PrimitiveType::Value => "value",
        }
    }

    /// Parse from short identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_has_ten_unique_types() {
        let set: HashSet<_> = PrimitiveType::all().iter().collect();
        assert_eq!(set.len(), 10);
    }

    #[test]
    fn test_id_roundtrip() {
        for t in PrimitiveType::all() {
            assert_eq!(PrimitiveType::from_id(t.id()), Some(*t));
        }
        assert_eq!(PrimitiveType::from_id("queue"), None);
    }

    #[test]
    fn test_display_uses_name() {
        assert_eq!(PrimitiveType::LeaderLatch.to_string(), "LeaderLatch");
        assert_eq!(PrimitiveType::IndexedMap.id(), "indexedmap");
    }
}
