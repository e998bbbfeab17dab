//! Playlist Store (C3)
//!
//! Holds the current URL pool, atomically swappable. Readers take a
//! snapshot `Arc<Vec<String>>` so a concurrent reload never tears a read:
//! a reader always observes either the whole old list or the whole new
//! one, never an intermediate length.

use std::sync::Arc;

use tokio::sync::RwLock;

/// An explicit handle over the URL pool, cloned by value to every consumer.
/// Replacement swaps the inner `Arc` rather than mutating the list in place.
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    inner: Arc<RwLock<Arc<Vec<String>>>>,
}

impl PlaylistStore {
    pub fn new(initial: Vec<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Take a torn-free snapshot of the current pool.
    pub async fn snapshot(&self) -> Arc<Vec<String>> {
        self.inner.read().await.clone()
    }

    /// Atomically replace the pool.
    pub async fn replace(&self, urls: Vec<String>) {
        *self.inner.write().await = Arc::new(urls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_sees_whole_old_or_whole_new_list() {
        let store = PlaylistStore::new(vec!["a".into(), "b".into()]);
        let before = store.snapshot().await;
        assert_eq!(before.len(), 2);

        store.replace(vec!["x".into(), "y".into(), "z".into()]).await;
        let after = store.snapshot().await;
        assert_eq!(after.len(), 3);

        // The earlier snapshot is unaffected by the swap.
        assert_eq!(before.len(), 2);
    }
}
