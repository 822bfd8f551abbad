//! Primitive names
//!
//! A [`Name`] identifies a primitive instance cluster-wide by the tuple
//! `(namespace, database, scope, name)`. Names are immutable once built.
//! A [`PrimitiveId`] pairs a name with its [`PrimitiveType`] and is the
//! identity carried on every request.

use crate::primitive_type::PrimitiveType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cluster-wide name of a primitive instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Name {
    namespace: String,
    database: String,
    scope: String,
    name: String,
}

impl Name {
    /// Create a new name
    pub fn new(
        namespace: impl Into<String>,
        database: impl Into<String>,
        scope: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            database: database.into(),
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Namespace the database lives in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Application scope
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Primitive name within the scope
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.namespace, self.database, self.scope, self.name
        )
    }
}

/// Typed identity of a primitive instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrimitiveId {
    /// Kind of primitive
    pub primitive_type: PrimitiveType,
    /// Cluster-wide name
    pub name: Name,
}

impl PrimitiveId {
    /// Create a new primitive identity
    pub fn new(primitive_type: PrimitiveType, name: Name) -> Self {
        Self {
            primitive_type,
            name,
        }
    }
}

impl fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.primitive_type.id(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_accessors() {
        let name = Name::new("default", "raft", "app", "users");
        assert_eq!(name.namespace(), "default");
        assert_eq!(name.database(), "raft");
        assert_eq!(name.scope(), "app");
        assert_eq!(name.name(), "users");
    }

    #[test]
    fn test_name_display() {
        let name = Name::new("ns", "db", "scope", "set");
        assert_eq!(name.to_string(), "ns/db/scope/set");
    }

    #[test]
    fn test_primitive_id_display() {
        let id = PrimitiveId::new(PrimitiveType::Set, Name::new("ns", "db", "scope", "s"));
        assert_eq!(id.to_string(), "set:ns/db/scope/s");
    }

    #[test]
    fn test_same_name_different_type_are_distinct() {
        let name = Name::new("ns", "db", "scope", "x");
        let a = PrimitiveId::new(PrimitiveType::Set, name.clone());
        let b = PrimitiveId::new(PrimitiveType::Map, name);
        assert_ne!(a, b);
    }
}
