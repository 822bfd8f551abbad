//! Indexed map service messages
//!
//! An indexed map is a map whose entries also keep insertion order: each
//! entry gets a monotonically increasing index when first inserted.

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};
use strata_core::ResponseStatus;

/// One entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Insertion index
    pub index: u64,
    /// Key
    pub key: String,
    /// Value
    pub value: Vec<u8>,
    /// Version of the last write
    pub version: u64,
}

/// Write an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRequest {
    /// Key
    pub key: String,
    /// Value
    pub value: Vec<u8>,
    /// Expected current version (0 for unconditional)
    pub version: u64,
}

/// Outcome of a put
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Entry as written
    pub entry: Entry,
}

/// Read by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Key
    pub key: String,
}

/// Read by insertion index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIndexRequest {
    /// Index
    pub index: u64,
}

/// Oldest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstEntryRequest {}

/// Newest entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEntryRequest {}

/// Optional entry result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryResponse {
    /// Entry, when present
    pub entry: Option<Entry>,
}

/// Remove by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    /// Key
    pub key: String,
    /// Expected current version (0 for unconditional)
    pub version: u64,
}

/// Outcome of a remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveResponse {
    /// Structured status
    pub status: ResponseStatus,
    /// Removed entry, if any
    pub entry: Option<Entry>,
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
    /// Emit an `Inserted` event for every current entry first
    pub replay: bool,
}

/// Kind of indexed map change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// New key
    Inserted,
    /// Existing key overwritten
    Updated,
    /// Key removed
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

operation!(PutRequest => PutResponse, "Put", status);
operation!(GetRequest => EntryResponse, "Get");
operation!(GetIndexRequest => EntryResponse, "GetIndex");
operation!(FirstEntryRequest => EntryResponse, "FirstEntry");
operation!(LastEntryRequest => EntryResponse, "LastEntry");
operation!(RemoveRequest => RemoveResponse, "Remove", status);
operation!(SizeRequest => SizeResponse, "Size");
operation!(ClearRequest => ClearResponse, "Clear");
operation!(EntriesRequest => EntriesResponse, "Entries");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
