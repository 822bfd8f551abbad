//! Value service messages

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};
use strata_core::ResponseStatus;

/// Read the value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {}

/// Current value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Value bytes (empty when never set)
    pub value: Vec<u8>,
    /// Version (0 when never set)
    pub version: u64,
}

/// Overwrite the value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    /// New value
    pub value: Vec<u8>,
    /// Expected current version (0 for unconditional)
    pub expect_version: u64,
}

/// Outcome of a set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Version after the write
    pub version: u64,
    /// Value before the write
    pub previous_value: Vec<u8>,
    /// Version before the write
    pub previous_version: u64,
}

/// Subscribe to changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit the current value first
    pub replay: bool,
}

/// Kind of value change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Value updated
    Updated,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// New value
    pub value: Vec<u8>,
    /// New version
    pub version: u64,
}

operation!(GetRequest => GetResponse, "Get");
operation!(SetRequest => SetResponse, "Set", status);
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
