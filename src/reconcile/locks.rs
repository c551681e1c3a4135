//! Per-user mutual exclusion for reconciliation.
//!
//! Operations for one user queue behind each other; different users never
//! contend. Entries nobody holds are pruned on the next acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct UserLocks {
    enabled: bool,
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one user's read-modify-write. `None` when locking is off.
pub type UserGuard = Option<OwnedMutexGuard<()>>;

impl UserLocks {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, user_id: &str) -> UserGuard {
        if !self.enabled {
            return None;
        }
        let slot = {
            let mut slots = match self.slots.lock() {
                Ok(slots) => slots,
                Err(poisoned) => poisoned.into_inner(),
            };
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            Arc::clone(slots.entry(user_id.to_string()).or_default())
        };
        Some(slot.lock_owned().await)
    }

    /// Users with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_serialized() {
        let locks = Arc::new(UserLocks::new(true));
        let guard = locks.acquire("u1").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire("u1").await.is_some() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        assert!(contender.await.unwrap());
    }

    #[tokio::test]
    async fn different_users_do_not_contend() {
        let locks = UserLocks::new(true);
        let _a = locks.acquire("u1").await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("u2")).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = UserLocks::new(true);
        drop(locks.acquire("u1").await);
        drop(locks.acquire("u2").await);
        let _held = locks.acquire("u3").await;
        assert_eq!(locks.tracked(), 1);
    }

    #[tokio::test]
    async fn disabled_locks_hand_out_nothing() {
        let locks = UserLocks::new(false);
        assert!(locks.acquire("u1").await.is_none());
        assert!(locks.acquire("u1").await.is_none());
    }
}
