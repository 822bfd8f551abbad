//! Map service messages
//!
//! Every entry carries a version assigned by the partition when the entry
//! was last written. Requests carrying a non-zero `version` only apply when
//! it matches the current entry version.

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};
use strata_core::ResponseStatus;

/// A versioned map entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Entry key
    pub key: String,
    /// Entry value
    pub value: Vec<u8>,
    /// Version of the last write (0 when absent)
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
    /// Entry before the write, if any
    pub previous: Option<Entry>,
}

/// Read an entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    /// Key
    pub key: String,
}

/// Entry read result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetResponse {
    /// Key
    pub key: String,
    /// Value (empty when absent)
    pub value: Vec<u8>,
    /// Version (0 when absent)
    pub version: u64,
}

/// Remove an entry
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
    pub previous: Option<Entry>,
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

/// Stream every entry
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

/// Kind of map change
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
    /// Entry after the change (before it, for `Removed`)
    pub entry: Entry,
}

operation!(PutRequest => PutResponse, "Put", status);
operation!(GetRequest => GetResponse, "Get");
operation!(RemoveRequest => RemoveResponse, "Remove", status);
operation!(SizeRequest => SizeResponse, "Size");
operation!(ClearRequest => ClearResponse, "Clear");
operation!(EntriesRequest => EntriesResponse, "Entries");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
