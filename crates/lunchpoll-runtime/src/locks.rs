//! Per-page mutual exclusion.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the duration of one read-modify-write cycle on a page.
pub type PageGuard = OwnedMutexGuard<()>;

/// Keyed async mutexes, one per page title.
///
/// Operations on different pages never contend. Entries no task holds or
/// waits on are pruned on the next acquisition.
#[derive(Debug, Default)]
pub struct PageLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PageLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `page`, then locks it.
    pub async fn acquire(&self, page: &str) -> PageGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(page.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of pages currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_page_is_exclusive() {
        let locks = Arc::new(PageLocks::new());
        let guard = locks.acquire("18/10/26").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("18/10/26").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_pages_do_not_contend() {
        let locks = PageLocks::new();
        let _first = locks.acquire("18/10/26").await;
        let second = tokio::time::timeout(Duration::from_secs(1), locks.acquire("19/10/26")).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_released_pages_are_pruned() {
        let locks = PageLocks::new();
        drop(locks.acquire("a").await);
        drop(locks.acquire("b").await);
        let _c = locks.acquire("c").await;
        assert_eq!(locks.tracked(), 1);
    }
}
