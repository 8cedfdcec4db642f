use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<i64, Arc<Mutex<()>>>;

/// Per-user async mutexes. Operations on one user run one at a time,
/// operations on different users never wait on each other.
#[derive(Clone, Default)]
pub struct UserLocks {
    locks: Arc<LockMap>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other task holds `user_id`, then returns the guard.
    pub async fn acquire(&self, user_id: i64) -> UserGuard {
        let lease = Lease {
            user_id,
            locks: Arc::clone(&self.locks),
        };
        let guard = lease.wait().await;

        UserGuard {
            user_id,
            guard,
            _lease: lease,
        }
    }

    /// Number of users with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// Claim on a map entry, held from the start of the wait until the guard is
/// released. Dropping the last claim evicts the entry, whether the lock was
/// ever taken or the waiting future was dropped.
struct Lease {
    user_id: i64,
    locks: Arc<LockMap>,
}

impl Lease {
    async fn wait(&self) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(self.user_id).or_default().clone();
        lock.lock_owned().await
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        // only the map's own reference left: nobody holds or waits on it
        self.locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Proof that the holder is the only task mutating `user_id`'s ledger rows.
pub struct UserGuard {
    user_id: i64,
    // released before the lease so the eviction check sees it gone
    guard: OwnedMutexGuard<()>,
    _lease: Lease,
}

impl UserGuard {
    pub fn user_id(&self) -> i64 {
        self.user_id
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_user_waits_for_release() {
        let locks = UserLocks::new();
        let first = locks.acquire(42).await;

        let pending = tokio::time::timeout(Duration::from_millis(50), locks.acquire(42)).await;
        assert!(pending.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(42)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.acquire(1).await;

        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
        assert_eq!(b.unwrap().user_id(), 2);
    }

    #[tokio::test]
    async fn entries_are_evicted_after_last_guard() {
        let locks = UserLocks::new();
        {
            let _a = locks.acquire(1).await;
            let _b = locks.acquire(2).await;
            assert_eq!(locks.tracked(), 2);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_someone_waits() {
        let locks = UserLocks::new();
        let first = locks.acquire(7).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(7).await.user_id() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(waiter.await.unwrap(), 7);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn abandoned_wait_leaves_no_entry() {
        let locks = UserLocks::new();
        let first = locks.acquire(7).await;

        let mut waiter = Box::pin(locks.acquire(7));
        let pending = tokio::time::timeout(Duration::from_millis(10), &mut waiter).await;
        assert!(pending.is_err());

        drop(first);
        drop(waiter);
        assert_eq!(locks.tracked(), 0);
    }
}
