//! Per-issue locking (spec §5).
//!
//! A lazily-populated table of one `Mutex<()>` per issue ID, never shrunk.
//! `with_lock` busy-waits with a short sleep until the deadline rather than
//! blocking indefinitely, surfacing [`BeadsError::Busy`] on timeout. No
//! `unsafe` and no extra lock-guard crate: the guard never outlives the
//! function that acquired it, so ordinary `std::sync::Mutex` borrowing
//! rules are enough.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};

use crate::error::{BeadsError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct LockTable {
    entries: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl LockTable {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn entry_for(&self, id: &str) -> Arc<Mutex<()>> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Run `f` while holding the lock for `id`. Polls for the lock until
    /// [`Self::timeout`] elapses, then returns [`BeadsError::Busy`].
    ///
    /// # Errors
    ///
    /// Returns [`BeadsError::Busy`] on timeout, or whatever `f` returns.
    pub fn with_lock<T>(&self, id: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mutex = self.entry_for(id);
        let deadline = Instant::now() + self.timeout;
        loop {
            match mutex.try_lock() {
                Ok(guard) => {
                    let result = f();
                    drop(guard);
                    return result;
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    let guard = poisoned.into_inner();
                    let result = f();
                    drop(guard);
                    return result;
                }
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        return Err(BeadsError::Busy { id: id.to_string() });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        }
    }
}
