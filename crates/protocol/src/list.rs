//! List service messages
//!
//! Index arguments outside the list report [`ResponseStatus::OutOfBounds`].

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};
use strata_core::ResponseStatus;

/// Append to the end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendRequest {
    /// Item
    pub value: Vec<u8>,
}

/// Append outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    /// Structured status
    pub status: ResponseStatus,
}

/// Insert at a position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRequest {
    /// Position (may equal the length)
    pub index: u64,
    /// Item
    pub value: Vec<u8>,
}

/// Insert outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    /// Structured status
    pub status: ResponseStatus,
}

/// Read a position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Position
    pub index: u64,
}

/// Item read result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Item (empty when out of bounds)
    pub value: Vec<u8>,
}

/// Overwrite a position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetRequest {
    /// Position
    pub index: u64,
    /// Item
    pub value: Vec<u8>,
}

/// Overwrite outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Item before the write
    pub previous: Vec<u8>,
}

/// Remove a position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Position
    pub index: u64,
}

/// Remove outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Removed item
    pub value: Vec<u8>,
}

/// Item count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRequest {}

/// Item count result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeResponse {
    /// Number of items
    pub size: u64,
}

/// Remove every item
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRequest {}

/// Clear acknowledged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {}

/// Stream every item in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterateRequest {}

/// One item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterateResponse {
    /// Item
    pub value: Vec<u8>,
}

/// Subscribe to changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit an `Added` event for every current item first
    pub replay: bool,
}

/// Kind of list change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Item added
    Added,
    /// Item overwritten
    Updated,
    /// Item removed
    Removed,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// Position
    pub index: u64,
    /// Item
    pub value: Vec<u8>,
}

operation!(AppendRequest => AppendResponse, "Append", status);
operation!(InsertRequest => InsertResponse, "Insert", status);
operation!(GetRequest => GetResponse, "Get", status);
operation!(SetRequest => SetResponse, "Set", status);
operation!(RemoveRequest => RemoveResponse, "Remove", status);
operation!(SizeRequest => SizeResponse, "Size");
operation!(ClearRequest => ClearResponse, "Clear");
operation!(IterateRequest => IterateResponse, "Iterate");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
