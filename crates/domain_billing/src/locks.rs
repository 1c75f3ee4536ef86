//! Per-entry run locks
//!
//! At most one billing run per entry number executes at a time among the
//! generators sharing a registry. Runs for different entries never wait on
//! each other. The in-memory ledger carries one registry, so every
//! generator over the same ledger is serialized per entry.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use core_kernel::PortError;

use crate::ports::EntryLease;

type Registry = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// Registry of per-entry async mutexes
#[derive(Debug, Default, Clone)]
pub struct EntryLocks {
    locks: Registry,
}

impl EntryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes the lock of `entry_number`; released on drop
    pub async fn acquire(&self, entry_number: &str) -> EntryLockGuard {
        let key = entry_number.trim().to_string();
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        debug!(entry_number = %key, "waiting for entry lock");
        let guard = lock.lock_owned().await;

        EntryLockGuard {
            guard: Some(guard),
            entry_number: key,
            registry: Arc::clone(&self.locks),
        }
    }

    /// Number of entries currently held or awaited
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held lock of one entry
///
/// Dropping it releases the entry and forgets the entry's mutex once no
/// other run holds or waits for it.
#[derive(Debug)]
pub struct EntryLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    entry_number: String,
    registry: Registry,
}

impl EntryLockGuard {
    pub fn entry_number(&self) -> &str {
        &self.entry_number
    }
}

impl Drop for EntryLockGuard {
    fn drop(&mut self) {
        // Waiters clone the mutex under the registry lock, so the count
        // cannot grow while it is held here.
        let mut locks = self.registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.guard.take();
        let idle = locks
            .get(&self.entry_number)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&self.entry_number);
        }
    }
}

#[async_trait]
impl EntryLease for EntryLockGuard {
    async fn release(self: Box<Self>) -> Result<(), PortError> {
        drop(self);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_entry_serialized() {
        let locks = EntryLocks::new();
        let guard = locks.acquire("316-1").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire("316-1").await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_different_entries_independent() {
        let locks = EntryLocks::new();
        let _a = locks.acquire("A").await;
        let _b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("B"))
            .await
            .unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_released_entries_are_forgotten() {
        let locks = EntryLocks::new();
        for entry in ["A", "B", "C"] {
            let guard = locks.acquire(entry).await;
            assert_eq!(guard.entry_number(), entry);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_entry_kept_while_a_run_waits() {
        let locks = EntryLocks::new();
        let guard = locks.acquire("A").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move { other.acquire("A").await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        assert_eq!(locks.len(), 1);

        let second = tokio::time::timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        drop(second);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_lease_release_unlocks() {
        let locks = EntryLocks::new();
        let lease: Box<dyn EntryLease> = Box::new(locks.acquire("A").await);
        lease.release().await.unwrap();

        tokio::time::timeout(Duration::from_millis(100), locks.acquire("A"))
            .await
            .unwrap();
    }
}
