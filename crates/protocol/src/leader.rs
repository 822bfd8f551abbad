//! Leader latch service messages
//!
//! Participants latch in arrival order; the first participant holds the
//! latch until it leaves or its session ends.

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};

/// Snapshot of a latch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Latch {
    /// Latch generation, bumped on every leader change
    pub id: u64,
    /// Current holder, if any
    pub leader: Option<String>,
    /// Participants in arrival order
    pub participants: Vec<String>,
}

/// Join the latch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatchRequest {
    /// Participant ID
    pub participant: String,
}

/// Latch after joining
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatchResponse {
    /// The latch
    pub latch: Latch,
}

/// Read the latch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {}

/// Current latch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// The latch
    pub latch: Latch,
}

/// Subscribe to latch changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit the current latch first
    pub replay: bool,
}

/// Kind of latch change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Leader or participant list changed
    Changed,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// Latch after the change
    pub latch: Latch,
}

operation!(LatchRequest => LatchResponse, "Latch");
operation!(GetRequest => GetResponse, "Get");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
