//! Countdown rendezvous with a bounded wait.
//!
//! A [`Rendezvous`] is created with a number of required arrivals. Every
//! [`arrive`](Rendezvous::arrive) decrements the count and wakes all waiters;
//! [`wait`](Rendezvous::wait) blocks until the count is exactly zero or the
//! timeout elapses. Reaching zero is a level condition: once there, every
//! later wait returns immediately.

use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

/// Timeout used when callers do not supply one (about 11.5 days).
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(1_000_000);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RendezvousError {
    #[error("rendezvous timeout after {timeout:?}")]
    Timeout { timeout: Duration },
}

/// Countdown barrier shared by the threads of one proof.
#[derive(Debug)]
pub struct Rendezvous {
    // Signed: over-arrival is tolerated and simply never releases waiters.
    remaining: Mutex<i64>,
    released: Condvar,
}

impl Rendezvous {
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            remaining: Mutex::new(i64::from(count)),
            released: Condvar::new(),
        }
    }

    /// Arrivals still required before waiters are released.
    #[must_use]
    pub fn remaining(&self) -> i64 {
        *self.remaining.lock()
    }

    pub fn arrive(&self) {
        {
            let mut remaining = self.remaining.lock();
            *remaining -= 1;
        }
        self.released.notify_all();
    }

    /// Block until the count reaches zero, or fail after `timeout`.
    pub fn wait(&self, timeout: Duration) -> Result<(), RendezvousError> {
        let mut remaining = self.remaining.lock();
        if *remaining == 0 {
            return Ok(());
        }
        let _ = self
            .released
            .wait_while_for(&mut remaining, |count| *count != 0, timeout);
        if *remaining == 0 {
            Ok(())
        } else {
            Err(RendezvousError::Timeout { timeout })
        }
    }

    /// [`wait`](Self::wait) with [`DEFAULT_WAIT_TIMEOUT`].
    pub fn wait_default(&self) -> Result<(), RendezvousError> {
        self.wait(DEFAULT_WAIT_TIMEOUT)
    }

    pub fn arrive_and_wait(&self, timeout: Duration) -> Result<(), RendezvousError> {
        self.arrive();
        self.wait(timeout)
    }
}
