//! Log service messages
//!
//! Entries are indexed from 1 in append order. Removed indexes are never
//! reused.

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};

/// One log entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Log index
    pub index: u64,
    /// Entry payload
    pub value: Vec<u8>,
}

/// Append an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendRequest {
    /// Payload
    pub value: Vec<u8>,
}

/// Appended entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    /// Index assigned to the entry
    pub index: u64,
}

/// Read an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Log index
    pub index: u64,
}

/// Optional entry result (shared by get, first, last and remove)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResponse {
    /// Entry, when present
    pub entry: Option<Entry>,
}

/// Oldest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstEntryRequest {}

/// Newest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEntryRequest {}

/// Remove an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Log index
    pub index: u64,
}

/// Entry count
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRequest {}

/// Entry count result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeResponse {
    /// Number of entries
    pub size: u64,
}

/// Remove every entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearRequest {}

/// Clear acknowledged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResponse {}

/// Stream every entry in index order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntriesRequest {}

/// One entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntriesResponse {
    /// The entry
    pub entry: Entry,
}

/// Subscribe to changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit an `Appended` event for every current entry first
    pub replay: bool,
}

/// Kind of log change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Entry appended
    Appended,
    /// Entry removed
    Removed,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// Affected entry
    pub entry: Entry,
}

operation!(AppendRequest => AppendResponse, "Append");
operation!(GetRequest => EntryResponse, "Get");
operation!(FirstEntryRequest => EntryResponse, "FirstEntry");
operation!(LastEntryRequest => EntryResponse, "LastEntry");
operation!(RemoveRequest => EntryResponse, "Remove");
operation!(SizeRequest => SizeResponse, "Size");
operation!(ClearRequest => ClearResponse, "Clear");
operation!(EntriesRequest => EntriesResponse, "Entries");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
