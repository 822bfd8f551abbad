//! Counter service messages

use crate::operation::operation;
use serde::{Deserialize, Serialize};

/// Read the counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {}

/// Current value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Counter value
    pub value: i64,
}

/// Overwrite the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    /// New value
    pub value: i64,
}

/// Set acknowledged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    /// Value before the set
    pub previous: i64,
}

/// Add to the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementRequest {
    /// Amount to add
    pub delta: i64,
}

/// Increment result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncrementResponse {
    /// Value before the increment
    pub previous: i64,
    /// Value after the increment
    pub next: i64,
}

/// Subtract from the counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecrementRequest {
    /// Amount to subtract
    pub delta: i64,
}

/// Decrement result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecrementResponse {
    /// Value before the decrement
    pub previous: i64,
    /// Value after the decrement
    pub next: i64,
}

operation!(GetRequest => GetResponse, "Get");
operation!(SetRequest => SetResponse, "Set");
operation!(IncrementRequest => IncrementResponse, "Increment");
operation!(DecrementRequest => DecrementResponse, "Decrement");
