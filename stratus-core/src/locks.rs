//! Advisory locks keyed by resource name
//!
//! CRUD calls for different resource instances may run concurrently. Child
//! resources stored inside a shared parent are written with
//! read-modify-write, so every mutation of the parent takes the lock for
//! `(parent name, parent type)` first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockKey = (String, String);
type LockTable = Arc<Mutex<HashMap<LockKey, Arc<AsyncMutex<()>>>>>;

/// Held lock; released when dropped
#[derive(Debug)]
pub struct NameLockGuard {
    key: LockKey,
    guard: Option<OwnedMutexGuard<()>>,
    table: LockTable,
}

impl NameLockGuard {
    pub fn name(&self) -> &str {
        &self.key.0
    }

    pub fn resource_type(&self) -> &str {
        &self.key.1
    }
}

impl Drop for NameLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        log::debug!("unlocking {:?} ({})", self.key.0, self.key.1);

        // The table holds the only reference once nobody waits for the name
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if table
            .get(&self.key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            table.remove(&self.key);
        }
    }
}

/// Registry of per-name mutexes shared by all CRUD calls of a provider
#[derive(Debug, Default)]
pub struct LockRegistry {
    table: LockTable,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock for `(name, resource_type)`
    pub async fn lock(&self, name: &str, resource_type: &str) -> NameLockGuard {
        let key = (name.to_string(), resource_type.to_string());
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.entry(key.clone()).or_default().clone()
        };

        log::debug!("locking {:?} ({})", key.0, key.1);
        let guard = mutex.lock_owned().await;
        NameLockGuard {
            key,
            guard: Some(guard),
            table: self.table.clone(),
        }
    }

    /// Number of names currently held or waited for
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
