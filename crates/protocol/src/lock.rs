//! Lock service messages
//!
//! A lock acquisition is a command that may complete long after it was
//! applied: the partition queues the session as a waiter and answers once
//! the lock is granted or the timeout elapses.

use crate::operation::operation;
use serde::{Deserialize, Serialize};

/// Acquire the lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    /// How long to wait; `None` waits indefinitely, `Some(0)` tries once
    pub timeout_ms: Option<u64>,
}

/// Acquisition result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    /// Whether the lock was granted
    pub acquired: bool,
    /// Lock version when granted
    pub version: u64,
}

/// Release the lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockRequest {
    /// Version to release (0 releases whatever this session holds)
    pub version: u64,
}

/// Release result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockResponse {
    /// Whether a held lock was released
    pub unlocked: bool,
}

/// Check the lock
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsLockedRequest {
    /// Only report locked when held at this version (0 for any)
    pub version: u64,
}

/// Check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsLockedResponse {
    /// Whether the lock is held
    pub locked: bool,
}

operation!(LockRequest => LockResponse, "Lock");
operation!(UnlockRequest => UnlockResponse, "Unlock");
operation!(IsLockedRequest => IsLockedResponse, "IsLocked");
