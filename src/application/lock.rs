//! Per-key async locks.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lazily populated map of independent async mutexes.
///
/// Holders of different keys never contend; holders of the same key are
/// serialized. Entries are created on first use and dropped by [`forget`]
/// once nobody holds or waits on them.
///
/// [`forget`]: KeyedLocks::forget
#[derive(Debug)]
pub struct KeyedLocks<K: Eq + Hash> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn slot(&self, key: &K) -> Arc<Mutex<()>> {
        let entry = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        self.slot(key).lock_owned().await
    }

    /// Take exclusive access to `key` if nobody holds it.
    pub fn try_lock(&self, key: &K) -> Option<OwnedMutexGuard<()>> {
        self.slot(key).try_lock_owned().ok()
    }

    /// Drop the entry for `key` if it is idle.
    pub fn forget(&self, key: &K) {
        self.locks
            .remove_if(key, |_, slot| Arc::strong_count(slot) == 1);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn try_lock_fails_while_held() {
        let locks = KeyedLocks::new();
        let guard = locks.try_lock(&"alice/bot").unwrap();
        assert!(locks.try_lock(&"alice/bot").is_none());
        drop(guard);
        assert!(locks.try_lock(&"alice/bot").is_some());
    }

    #[tokio::test]
    async fn different_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(&"alice/bot").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&"bob/bot")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn same_key_waits_for_release() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.lock(&"alice/bot").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(&"alice/bot").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn forget_keeps_held_entries() {
        let locks = KeyedLocks::new();
        let guard = locks.lock(&"alice/bot").await;
        locks.forget(&"alice/bot");
        assert_eq!(locks.len(), 1);

        drop(guard);
        locks.forget(&"alice/bot");
        assert!(locks.is_empty());
    }
}
