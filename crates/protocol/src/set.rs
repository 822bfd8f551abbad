//! Set service messages
//!
//! | Method | Kind | Request | Response |
//! |--------|------|---------|----------|
//! | Add | command | `AddRequest` | `AddResponse` |
//! | Remove | command | `RemoveRequest` | `RemoveResponse` |
//! | Contains | query | `ContainsRequest` | `ContainsResponse` |
//! | Size | query | `SizeRequest` | `SizeResponse` |
//! | Clear | command | `ClearRequest` | `ClearResponse` |
//! | Iterate | query stream | `IterateRequest` | `IterateResponse` |
//! | Events | command stream | `EventRequest` | `EventResponse` |

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};
use strata_core::ResponseStatus;

/// Add a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddRequest {
    /// Value to add
    pub value: String,
}

/// Outcome of an add
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Whether the value was not already present
    pub added: bool,
}

/// Remove a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Value to remove
    pub value: String,
}

/// Outcome of a remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Whether the value was present
    pub removed: bool,
}

/// Membership test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainsRequest {
    /// Value to look up
    pub value: String,
}

/// Membership result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainsResponse {
    /// Whether the value is present
    pub contains: bool,
}

/// Element count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRequest {}

/// Element count result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeResponse {
    /// Number of elements
    pub size: u64,
}

/// Remove every element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRequest {}

/// Clear acknowledged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {}

/// Stream every element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterateRequest {}

/// One element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterateResponse {
    /// Element value
    pub value: String,
}

/// Subscribe to changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit an `Added` event for every current element first
    pub replay: bool,
}

/// Kind of set change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Element added
    Added,
    /// Element removed
    Removed,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// Affected element
    pub value: String,
}

operation!(AddRequest => AddResponse, "Add", status);
operation!(RemoveRequest => RemoveResponse, "Remove", status);
operation!(ContainsRequest => ContainsResponse, "Contains");
operation!(SizeRequest => SizeResponse, "Size");
operation!(ClearRequest => ClearResponse, "Clear");
operation!(IterateRequest => IterateResponse, "Iterate");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
