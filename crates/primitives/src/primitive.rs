//! Session-backed primitive scaffold
//!
//! Every primitive client wraps a [`Primitive`]: the primitive's identity
//! plus the ordered session list of its database. Routing picks one
//! partition per primitive by hashing its full name, so all of a
//! primitive's commands, queries and streams go to the same partition and
//! the choice never changes for the lifetime of the database.
//!
//! Outputs have their structured status checked here, once, so clients
//! only see `Ok` outputs; `WRITE_LOCK` surfaces as [`Error::WriteLock`].

use futures::stream::BoxStream;
use futures::StreamExt;
use std::sync::Arc;
use strata_core::{Error, Name, PrimitiveId, PrimitiveType, Result};
use strata_protocol::Operation;
use strata_session::Session;
use tracing::debug;

/// Lazily consumed, finite sequence of items (e.g. set elements)
pub type ItemStream<T> = BoxStream<'static, Result<T>>;

/// Open-ended sequence of watch events
pub type EventStream<E> = BoxStream<'static, Result<E>>;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a
fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Index of the partition serving a primitive among `partitions` sorted ones
pub fn route(name: &Name, partitions: usize) -> usize {
    if partitions == 0 {
        return 0;
    }
    (fnv1a(name.to_string().as_bytes()) % partitions as u64) as usize
}

/// A primitive bound to its database's sessions
#[derive(Clone)]
pub struct Primitive {
    id: PrimitiveId,
    sessions: Vec<Arc<Session>>,
    route: usize,
}

impl std::fmt::Debug for Primitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Primitive")
            .field("id", &self.id)
            .field("partitions", &self.sessions.len())
            .field("route", &self.route)
            .finish()
    }
}

impl Primitive {
    /// Bind a primitive to the ordered session list
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if there are no sessions.
    pub fn new(id: PrimitiveId, sessions: Vec<Arc<Session>>) -> Result<Self> {
        if sessions.is_empty() {
            return Err(Error::invalid_argument(format!(
                "{} has no partitions to bind to",
                id
            )));
        }
        let route = route(&id.name, sessions.len());
        Ok(Self {
            id,
            sessions,
            route,
        })
    }

    /// Typed identity
    pub fn id(&self) -> &PrimitiveId {
        &self.id
    }

    /// Cluster-wide name
    pub fn name(&self) -> &Name {
        &self.id.name
    }

    /// Kind of primitive
    pub fn primitive_type(&self) -> PrimitiveType {
        self.id.primitive_type
    }

    /// Session of the partition serving this primitive
    pub fn session(&self) -> &Session {
        &self.sessions[self.route]
    }

    /// Position of the serving partition in the database's sorted list
    pub fn partition_index(&self) -> usize {
        self.route
    }

    /// Run a command, mapping a non-`Ok` status to its error
    pub async fn command<O: Operation>(&self, operation: O) -> Result<O::Output> {
        let output = self.session().command(&self.id, operation).await?;
        O::status(&output).into_result()?;
        Ok(output)
    }

    /// Run a query, mapping a non-`Ok` status to its error
    pub async fn query<O: Operation>(&self, operation: O) -> Result<O::Output> {
        let output = self.session().query(&self.id, operation).await?;
        O::status(&output).into_result()?;
        Ok(output)
    }

    /// Open a query stream and convert each item
    pub async fn query_stream<O, T, F>(&self, operation: O, convert: F) -> Result<ItemStream<T>>
    where
        O: Operation,
        T: Send + 'static,
        F: Fn(O::Output) -> T + Send + 'static,
    {
        let stream = self.session().query_stream(&self.id, operation).await?;
        Ok(stream.map(move |item| item.map(&convert)).boxed())
    }

    /// Open a command stream and convert each item
    pub async fn command_stream<O, E, F>(&self, operation: O, convert: F) -> Result<EventStream<E>>
    where
        O: Operation,
        E: Send + 'static,
        F: Fn(O::Output) -> E + Send + 'static,
    {
        let stream = self.session().command_stream(&self.id, operation).await?;
        Ok(stream.map(move |item| item.map(&convert)).boxed())
    }

    /// Release the primitive's session-scoped state on every partition
    ///
    /// All partitions are attempted; the last failure is returned.
    pub async fn close(&self) -> Result<()> {
        let mut last = None;
        for session in &self.sessions {
            if let Err(e) = session.close_primitive(&self.id).await {
                debug!(primitive = %self.id, error = %e, "Primitive close failed");
                last = Some(e);
            }
        }
        last.map_or(Ok(()), Err)
    }

    /// Destroy the primitive's state on every partition
    ///
    /// All partitions are attempted; the last failure is returned.
    pub async fn delete(&self) -> Result<()> {
        let mut last = None;
        for session in &self.sessions {
            if let Err(e) = session.delete(&self.id).await {
                debug!(primitive = %self.id, error = %e, "Primitive delete failed");
                last = Some(e);
            }
        }
        last.map_or(Ok(()), Err)
    }
}

/// Shared surface of every primitive client
macro_rules! primitive_client {
    ($client:ident) => {
        impl $client {
            /// Wrap a bound primitive
            pub fn new(primitive: $crate::primitive::Primitive) -> Self {
                Self { primitive }
            }

            /// Cluster-wide name
            pub fn name(&self) -> &::strata_core::Name {
                self.primitive.name()
            }

            /// Kind of primitive
            pub fn primitive_type(&self) -> ::strata_core::PrimitiveType {
                self.primitive.primitive_type()
            }

            /// Release this client's session-scoped state (watches, locks,
            /// candidacies); the primitive's data is kept
            pub async fn close(&self) -> ::strata_core::Result<()> {
                self.primitive.close().await
            }

            /// Destroy the primitive's state
            pub async fn delete(&self) -> ::strata_core::Result<()> {
                self.primitive.delete().await
            }
        }
    };
}

pub(crate) use primitive_client;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_fnv1a_known_values() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }

    #[test]
    fn test_route_single_partition() {
        let name = Name::new("ns", "db", "scope", "anything");
        assert_eq!(route(&name, 1), 0);
        assert_eq!(route(&name, 0), 0);
    }

    #[test]
    fn test_route_depends_on_full_name() {
        let names: Vec<usize> = (0..64)
            .map(|i| route(&Name::new("ns", "db", "scope", &format!("p{}", i)), 4))
            .collect();
        // 64 names over 4 partitions should not all collapse onto one
        assert!(names.iter().any(|&r| r != names[0]));
    }

    proptest! {
        #[test]
        fn prop_route_is_stable_and_in_range(name in "[a-z]{1,16}", partitions in 1usize..16) {
            let name = Name::new("ns", "db", "scope", &name);
            let first = route(&name, partitions);
            prop_assert!(first < partitions);
            prop_assert_eq!(first, route(&name, partitions));
        }
    }
}
