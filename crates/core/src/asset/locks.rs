//! Per-key mutual exclusion for the check-then-write sequence.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// In-process lock table keyed by storage key.
///
/// Only one holder per key at a time. Entries are dropped once no task holds
/// or waits on them.
#[derive(Debug, Default, Clone)]
pub struct KeyLocks {
    inner: Arc<DashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let mutex = self
            .inner
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = mutex.lock_owned().await;
        KeyGuard {
            key: key.to_string(),
            table: Arc::clone(&self.inner),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

/// Exclusive hold on one key; released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    key: String,
    table: Arc<DashMap<String, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // The table holds one reference; any other means a waiter.
        self.table
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
