//! Error types for the partition client
//!
//! All failures surfaced by sessions, primitives and the database are
//! represented by [`Error`]. We use `thiserror` for `Display`/`Error`.
//!
//! # Categories
//!
//! | Category | Variants | Recoverable |
//! |----------|----------|-------------|
//! | Transport | `Connection`, `Timeout` | Yes: resend with the original sequence number |
//! | Session | `SessionExpired` | No: a new session is required |
//! | Outcome | `WriteLock`, `PreconditionFailed` | Yes: at the caller's discretion |
//! | Database | `PartitionUnavailable`, `CloseFailed` | No |
//! | Protocol | `Rpc`, `Serialization` | No |
//! | Input | `InvalidConfig`, `InvalidArgument` | No |

use std::io;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, Error>;

/// Client error taxonomy
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Transport-level failure to reach a partition
    #[error("connection error ({address}): {reason}")]
    Connection {
        /// Address that could not be reached
        address: String,
        /// Failure detail
        reason: String,
    },

    /// No response arrived within the allotted time
    #[error("{operation} timed out after {elapsed_ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Time waited in milliseconds
        elapsed_ms: u64,
    },

    /// The server no longer recognizes the session, or it was closed
    #[error("session {session_id} expired")]
    SessionExpired {
        /// Session ID (0 if never assigned)
        session_id: u64,
    },

    /// A mutating command was rejected due to write contention
    #[error("write lock failed")]
    WriteLock,

    /// A version or state precondition did not hold
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// Failure detail
        reason: String,
    },

    /// A partition session could not be opened while building a database
    #[error("partition {partition} unavailable: {source}")]
    PartitionUnavailable {
        /// Partition ID
        partition: u32,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// One or more sessions failed to close; carries the last failure
    #[error("{failed} session(s) failed to close: {source}")]
    CloseFailed {
        /// Number of failed closes
        failed: usize,
        /// Last failure encountered
        #[source]
        source: Box<Error>,
    },

    /// The server reported a failure or the call could not complete
    #[error("rpc error: {reason}")]
    Rpc {
        /// Failure detail
        reason: String,
    },

    /// Encoding or decoding a message failed
    #[error("serialization error: {reason}")]
    Serialization {
        /// Failure detail
        reason: String,
    },

    /// Configuration is malformed
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Failure detail
        reason: String,
    },

    /// A call argument is out of range
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Failure detail
        reason: String,
    },
}

impl Error {
    /// Create a connection error
    pub fn connection(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Connection {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, elapsed: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Create an RPC error
    pub fn rpc(reason: impl Into<String>) -> Self {
        Error::Rpc {
            reason: reason.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        Error::Serialization {
            reason: reason.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Error::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Create a precondition error
    pub fn precondition_failed(reason: impl Into<String>) -> Self {
        Error::PreconditionFailed {
            reason: reason.into(),
        }
    }

    /// Wrap a session-open failure for a partition
    pub fn partition_unavailable(partition: u32, source: Error) -> Self {
        Error::PartitionUnavailable {
            partition,
            source: Box::new(source),
        }
    }

    /// Transient transport failure that is safe to resend unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection { .. } | Error::Timeout { .. })
    }

    /// Whether this is the distinguished write-contention outcome
    pub fn is_write_lock(&self) -> bool {
        matches!(self, Error::WriteLock)
    }

    /// Whether the session is gone
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired { .. })
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Connection {
            address: String::new(),
            reason: e.to_string(),
        }
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization {
            reason: e.to_string(),
        }
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization {
            reason: e.to_string(),
        }
    }
}
