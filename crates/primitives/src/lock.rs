//! Lock: a distributed exclusive lock
//!
//! A lock is held by a session. Closing the lock client (or the session)
//! releases it, and waiting sessions are granted the lock in arrival order.
//! Each acquisition is identified by a version.
//!
//! A wait is also bounded by the session's request timeout.

use crate::primitive::{primitive_client, Primitive};
use std::time::Duration;
use strata_core::Result;
use strata_protocol::lock::{IsLockedRequest, LockRequest, UnlockRequest};

/// Client of a distributed lock
#[derive(Debug, Clone)]
pub struct Lock {
    primitive: Primitive,
}

primitive_client!(Lock);

impl Lock {
    /// Acquire the lock, waiting up to `timeout` (forever when `None`)
    ///
    /// Returns the acquisition version, or `None` if the wait timed out.
    /// A zero timeout only tries once.
    pub async fn lock(&self, timeout: Option<Duration>) -> Result<Option<u64>> {
        let request = LockRequest {
            timeout_ms: timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX)),
        };
        let response = self.primitive.command(request).await?;
        Ok(response.acquired.then_some(response.version))
    }

    /// Acquire the lock without waiting
    pub async fn try_lock(&self) -> Result<Option<u64>> {
        self.lock(Some(Duration::ZERO)).await
    }

    /// Release the lock held by this session
    ///
    /// With a nonzero `version` only that acquisition is released. Returns
    /// whether the lock was released.
    pub async fn unlock(&self, version: u64) -> Result<bool> {
        Ok(self.primitive.command(UnlockRequest { version }).await?.unlocked)
    }

    /// Whether the lock is held (at `version`, when given)
    pub async fn is_locked(&self, version: Option<u64>) -> Result<bool> {
        let request = IsLockedRequest {
            version: version.unwrap_or(0),
        };
        Ok(self.primitive.query(request).await?.locked)
    }
}
