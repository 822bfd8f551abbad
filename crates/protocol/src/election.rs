//! Election service messages
//!
//! Candidates are identified by session ID. The first candidate in the
//! queue is the leader; every leadership change starts a new term.

use crate::operation::{operation, replayable};
use serde::{Deserialize, Serialize};

/// Snapshot of an election
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Term number (0 before any leader)
    pub term: u64,
    /// Current leader, if any
    pub leader: Option<String>,
    /// Candidates in priority order, leader first
    pub candidates: Vec<String>,
}

/// Outcome of a mutating election call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermResponse {
    /// Term after the call
    pub term: Term,
    /// Whether the call changed anything
    pub applied: bool,
}

/// Join as a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterRequest {
    /// Candidate ID
    pub candidate: String,
}

/// Withdraw a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    /// Candidate ID
    pub candidate: String,
}

/// Make a candidate the leader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnointRequest {
    /// Candidate ID
    pub candidate: String,
}

/// Move a candidate up one place
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoteRequest {
    /// Candidate ID
    pub candidate: String,
}

/// Remove another candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvictRequest {
    /// Candidate ID
    pub candidate: String,
}

/// Read the current term
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTermRequest {}

/// Current term
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetTermResponse {
    /// The term
    pub term: Term,
}

/// Subscribe to term changes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRequest {
    /// Emit the current term first
    pub replay: bool,
}

/// Kind of election change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    /// No change (heartbeat)
    None,
    /// Leader or candidate list changed
    Changed,
}

/// One change notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventResponse {
    /// Kind of change
    pub r#type: EventType,
    /// Term after the change
    pub term: Term,
}

operation!(EnterRequest => TermResponse, "Enter");
operation!(LeaveRequest => TermResponse, "Leave");
operation!(AnointRequest => TermResponse, "Anoint");
operation!(PromoteRequest => TermResponse, "Promote");
operation!(EvictRequest => TermResponse, "Evict");
operation!(GetTermRequest => GetTermResponse, "GetTerm");
operation!(EventRequest => EventResponse, "Events");
replayable!(EventRequest);
