//! Mutual exclusion for catalog read-modify-write sequences.
//!
//! Lock order is fixed to avoid deadlocks: an object key lock is always
//! taken before the bucket catalog lock, which is always taken before an
//! object catalog lock. The content store's per-bucket directory lock comes
//! after all of them and is never held while waiting on another.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Above this many entries, idle locks are dropped on the next acquisition.
const PRUNE_THRESHOLD: usize = 1024;

/// A table of async locks addressed by string key, created on demand.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedLocks {
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            if table.len() > PRUNE_THRESHOLD {
                // An entry only the table references has no holder or waiter.
                table.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            table.entry(key.to_string()).or_default().clone()
        };
        entry.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// All locks guarding the on-disk state of one data directory.
#[derive(Debug, Default)]
pub struct CatalogLocks {
    buckets: Arc<AsyncMutex<()>>,
    object_catalogs: KeyedLocks,
    object_keys: KeyedLocks,
}

impl CatalogLocks {
    /// Guard for the bucket catalog.
    pub async fn bucket_catalog(&self) -> OwnedMutexGuard<()> {
        self.buckets.clone().lock_owned().await
    }

    /// Guard for one bucket's object catalog.
    pub async fn object_catalog(&self, bucket: &str) -> OwnedMutexGuard<()> {
        self.object_catalogs.lock(bucket).await
    }

    /// Guard serializing writers of a single object key.
    pub async fn object_key(&self, bucket: &str, key: &str) -> OwnedMutexGuard<()> {
        // bucket names never contain '/', so this join is unambiguous
        self.object_keys.lock(&format!("{}/{}", bucket, key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::default());
        let guard = locks.lock("docs").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("docs").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // a different key is independent
        let _other = locks.lock("photos").await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = KeyedLocks::default();
        for i in 0..=PRUNE_THRESHOLD + 1 {
            let _g = locks.lock(&format!("k{i}")).await;
        }
        assert!(locks.len() <= PRUNE_THRESHOLD + 1);
    }
}
