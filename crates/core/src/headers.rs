//! Request and response headers
//!
//! Every RPC carries session metadata. Commands carry a fresh sequence
//! number; queries carry the last issued command sequence and the highest
//! index the session has observed so the partition can serve them
//! read-your-writes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned session identifier (0 before open)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Whether the server has assigned this ID yet
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation metadata attached to every outgoing request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHeader {
    /// Target partition
    pub partition: u32,
    /// Session the request belongs to
    pub session_id: SessionId,
    /// Command: this command's sequence number.
    /// Query: the last command sequence issued by the session.
    pub sequence_number: u64,
    /// Highest state-machine index the session has observed
    pub index: u64,
}

/// Session-level failure reported by a partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerError {
    /// The partition no longer knows the session
    UnknownSession,
    /// The request could not be decoded or dispatched
    Internal {
        /// Failure detail
        message: String,
    },
}

/// Correlation metadata attached to every response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// Session the response belongs to
    pub session_id: SessionId,
    /// State-machine index at which the response was produced
    pub index: u64,
    /// Sequence number of the command this responds to (0 for queries)
    pub sequence_number: u64,
    /// Session-level failure, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ServerError>,
}

impl ResponseHeader {
    /// Convert a session-level failure into a client error
    pub fn check(&self) -> Result<()> {
        match &self.error {
            None => Ok(()),
            Some(ServerError::UnknownSession) => Err(Error::SessionExpired {
                session_id: self.session_id.0,
            }),
            Some(ServerError::Internal { message }) => Err(Error::rpc(message.clone())),
        }
    }
}

/// Structured outcome of a primitive operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseStatus {
    /// Operation applied
    #[default]
    Ok,
    /// Rejected due to write contention
    WriteLock,
    /// Rejected because a version or state precondition did not hold
    PreconditionFailed,
    /// An index argument was outside the primitive's bounds
    OutOfBounds,
}

impl ResponseStatus {
    /// Map non-`Ok` statuses to their distinguished errors
    pub fn into_result(self) -> Result<()> {
        match self {
            ResponseStatus::Ok => Ok(()),
            ResponseStatus::WriteLock => Err(Error::WriteLock),
            ResponseStatus::PreconditionFailed => {
                Err(Error::precondition_failed("version mismatch"))
            }
            ResponseStatus::OutOfBounds => Err(Error::invalid_argument("index out of bounds")),
        }
    }
}
