//! Fault injection for a test replica

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use strata_core::{Address, Error, Result};

/// Faults a replica applies to the traffic it receives
#[derive(Debug, Default)]
pub struct Faults {
    fail_requests: AtomicUsize,
    drop_responses: AtomicUsize,
    locked_writes: AtomicUsize,
    fail_close: AtomicBool,
    unreachable: AtomicBool,
}

/// Take one from a countdown; true when it was positive
fn take(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl Faults {
    /// Fail the next `n` requests with a connection error before they are delivered
    pub fn fail_next_requests(&self, n: usize) {
        self.fail_requests.store(n, Ordering::SeqCst);
    }

    /// Apply the next `n` requests but lose their responses
    pub fn drop_next_responses(&self, n: usize) {
        self.drop_responses.store(n, Ordering::SeqCst);
    }

    /// Reject the next `n` writes with `WriteLock`
    pub fn lock_next_writes(&self, n: usize) {
        self.locked_writes.store(n, Ordering::SeqCst);
    }

    /// Make session close requests fail
    pub fn fail_session_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::SeqCst);
    }

    /// Refuse connections and requests
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Whether the replica refuses traffic
    pub fn is_unreachable(&self) -> bool {
        self.unreachable.load(Ordering::SeqCst)
    }

    pub(crate) fn before_delivery(&self, address: &Address) -> Result<()> {
        if self.is_unreachable() {
            return Err(Error::connection(address.as_str(), "partition unreachable"));
        }
        if take(&self.fail_requests) {
            return Err(Error::connection(address.as_str(), "injected request failure"));
        }
        Ok(())
    }

    pub(crate) fn after_apply(&self, address: &Address) -> Result<()> {
        if take(&self.drop_responses) {
            return Err(Error::connection(address.as_str(), "injected response loss"));
        }
        Ok(())
    }

    pub(crate) fn take_write_lock(&self) -> bool {
        take(&self.locked_writes)
    }

    pub(crate) fn close_fails(&self) -> bool {
        self.fail_close.load(Ordering::SeqCst)
    }
}
