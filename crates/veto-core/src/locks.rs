//! Per-session async locks.
//!
//! Every mutation holds its session's lock for the whole
//! read-validate-append-persist-reload cycle. Idle entries are pruned on the
//! next acquisition.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use veto_types::SessionId;

/// Lock table keyed by session.
#[derive(Debug, Default)]
pub struct SessionLocks {
    table: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut table = self.table.lock().await;
            // Only the table itself holds an idle entry.
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(table.entry(session_id).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_session_is_exclusive() {
        let locks = Arc::new(SessionLocks::new());
        let id = SessionId::new();
        let guard = locks.acquire(id).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(guard);
        let joined = tokio::time::timeout(Duration::from_secs(1), contender).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn different_sessions_do_not_contend() {
        let locks = SessionLocks::new();
        let _a = locks.acquire(SessionId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(SessionId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_entries_are_pruned() {
        let locks = SessionLocks::new();
        drop(locks.acquire(SessionId::new()).await);
        let _held = locks.acquire(SessionId::new()).await;
        assert_eq!(locks.table.lock().await.len(), 1);
    }
}
