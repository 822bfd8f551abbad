//! Counter: a distributed 64-bit signed counter

use crate::primitive::{primitive_client, Primitive};
use strata_core::Result;
use strata_protocol::counter::{DecrementRequest, GetRequest, IncrementRequest, SetRequest};

/// Client of a distributed counter
#[derive(Debug, Clone)]
pub struct Counter {
    primitive: Primitive,
}

primitive_client!(Counter);

impl Counter {
    /// Current value
    pub async fn get(&self) -> Result<i64> {
        Ok(self.primitive.query(GetRequest {}).await?.value)
    }

    /// Replace the value; returns the previous one
    pub async fn set(&self, value: i64) -> Result<i64> {
        Ok(self.primitive.command(SetRequest { value }).await?.previous)
    }

    /// Add `delta`; returns the new value
    pub async fn increment(&self, delta: i64) -> Result<i64> {
        Ok(self.primitive.command(IncrementRequest { delta }).await?.next)
    }

    /// Subtract `delta`; returns the new value
    pub async fn decrement(&self, delta: i64) -> Result<i64> {
        Ok(self.primitive.command(DecrementRequest { delta }).await?.next)
    }
}
