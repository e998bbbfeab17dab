//! Clip Queue (C5)
//!
//! A bounded FIFO of [`Clip`]s with per-item timestamps, lazy + proactive
//! stale eviction, and a single-slot last-good memory used by the pusher as
//! a continuity filler.
//!
//! All mutations of the FIFO are serialized behind one `tokio::sync::Mutex`.
//! `last_good` lives behind its own `RwLock` so pusher reads of it never
//! block a worker's enqueue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::QueueError;
use crate::models::Clip;

/// How often `put`/`get` re-check the queue while waiting for capacity or
/// an item to appear.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

struct State {
    items: VecDeque<Clip>,
}

pub struct ClipQueue {
    state: Mutex<State>,
    last_good: RwLock<Option<Clip>>,
    capacity: usize,
    stale: Duration,
    stopped: Arc<AtomicBool>,
}

impl ClipQueue {
    /// Create a new queue and start its internal sweeper task, which scans
    /// every `cleanup_interval` and evicts anything older than `stale`.
    pub fn new(capacity: usize, stale: Duration, cleanup_interval: Duration) -> Arc<Self> {
        let queue = Arc::new(Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
            }),
            last_good: RwLock::new(None),
            capacity,
            stale,
            stopped: Arc::new(AtomicBool::new(false)),
        });

        queue.clone().spawn_sweeper(cleanup_interval);
        queue
    }

    fn spawn_sweeper(self: Arc<Self>, cleanup_interval: Duration) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_interval);
            loop {
                interval.tick().await;
                if self.stopped.load(Ordering::Relaxed) {
                    break;
                }
                self.sweep_stale().await;
            }
        });
    }

    async fn sweep_stale(&self) {
        let removed: Vec<Clip> = {
            let mut state = self.state.lock().await;
            let mut survivors = VecDeque::with_capacity(state.items.len());
            let mut removed = Vec::new();
            while let Some(clip) = state.items.pop_front() {
                if clip.is_fresh(self.stale) {
                    survivors.push_back(clip);
                } else {
                    removed.push(clip);
                }
            }
            state.items = survivors;
            removed
        };

        if !removed.is_empty() {
            debug!("queue sweeper removing {} stale clip(s)", removed.len());
        }
        for clip in removed {
            unlink_best_effort(&clip).await;
        }
    }

    /// Block up to `timeout` for capacity; fail with `QueueError::Full` on
    /// timeout. Records `enqueued_at = now` on success.
    pub async fn put(&self, path: std::path::PathBuf, timeout: Duration) -> Result<(), QueueError> {
        let clip = Clip::new(path);
        let deadline = Instant::now() + timeout;

        loop {
            {
                let mut state = self.state.lock().await;
                if state.items.len() < self.capacity {
                    state.items.push_back(clip);
                    return Ok(());
                }
            }

            if Instant::now() >= deadline {
                return Err(QueueError::Full);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - Instant::now())).await;
        }
    }

    /// Block up to `timeout` for a fresh clip. Stale entries encountered
    /// along the way are discarded (file unlinked) within the same timeout
    /// budget, best-effort. Updates `last_good` on success.
    pub async fn get(&self, timeout: Duration) -> Option<Clip> {
        let deadline = Instant::now() + timeout;

        loop {
            let (found, discarded) = {
                let mut state = self.state.lock().await;
                let mut discarded = Vec::new();
                let mut found = None;
                while let Some(clip) = state.items.pop_front() {
                    if clip.is_fresh(self.stale) {
                        found = Some(clip);
                        break;
                    }
                    discarded.push(clip);
                }
                (found, discarded)
            };

            for clip in &discarded {
                warn!("discarding stale clip {}", clip.path.display());
                unlink_best_effort(clip).await;
            }

            if let Some(clip) = found {
                *self.last_good.write().await = Some(clip.clone());
                return Some(clip);
            }

            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - Instant::now())).await;
        }
    }

    pub async fn size(&self) -> usize {
        self.state.lock().await.items.len()
    }

    /// Non-destructive snapshot of every path currently held in the FIFO,
    /// used by the buffer janitor to decide what's still referenced.
    pub async fn snapshot_paths(&self) -> std::collections::HashSet<std::path::PathBuf> {
        self.state
            .lock()
            .await
            .items
            .iter()
            .map(|clip| clip.path.clone())
            .collect()
    }

    pub async fn last(&self) -> Option<Clip> {
        self.last_good.read().await.clone()
    }

    /// Signal the internal sweeper to exit at its next tick.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

async fn unlink_best_effort(clip: &Clip) {
    if let Err(err) = tokio::fs::remove_file(&clip.path).await {
        if err.kind() != std::io::ErrorKind::NotFound {
            warn!("failed to unlink clip {}: {}", clip.path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn touch(path: &PathBuf) {
        tokio::fs::write(path, b"clip").await.unwrap();
    }

    #[tokio::test]
    async fn put_then_get_returns_fifo_order() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ClipQueue::new(14, Duration::from_secs(30), Duration::from_secs(10));

        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");
        touch(&a).await;
        touch(&b).await;

        queue.put(a.clone(), Duration::from_secs(1)).await.unwrap();
        queue.put(b.clone(), Duration::from_secs(1)).await.unwrap();

        let first = queue.get(Duration::from_secs(1)).await.unwrap();
        assert_eq!(first.path, a);
        let second = queue.get(Duration::from_secs(1)).await.unwrap();
        assert_eq!(second.path, b);

        queue.stop();
    }

    #[tokio::test]
    async fn put_fails_with_full_when_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ClipQueue::new(1, Duration::from_secs(30), Duration::from_secs(10));

        let a = dir.path().join("a.ts");
        let b = dir.path().join("b.ts");
        touch(&a).await;
        touch(&b).await;

        queue.put(a, Duration::from_millis(50)).await.unwrap();
        let result = queue.put(b, Duration::from_millis(50)).await;
        assert_eq!(result, Err(QueueError::Full));

        queue.stop();
    }

    #[tokio::test]
    async fn get_times_out_on_empty_queue() {
        let queue = ClipQueue::new(14, Duration::from_secs(30), Duration::from_secs(10));
        let result = queue.get(Duration::from_millis(50)).await;
        assert!(result.is_none());
        queue.stop();
    }

    #[tokio::test]
    async fn last_good_is_set_only_after_a_successful_get() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ClipQueue::new(14, Duration::from_secs(30), Duration::from_secs(10));
        assert!(queue.last().await.is_none());

        let a = dir.path().join("a.ts");
        touch(&a).await;
        queue.put(a.clone(), Duration::from_secs(1)).await.unwrap();
        let clip = queue.get(Duration::from_secs(1)).await.unwrap();

        let last = queue.last().await.unwrap();
        assert_eq!(last.path, clip.path);
        queue.stop();
    }

    #[tokio::test]
    async fn stale_clip_is_discarded_on_get_and_never_returned() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ClipQueue::new(14, Duration::from_millis(10), Duration::from_secs(10));

        let a = dir.path().join("a.ts");
        touch(&a).await;
        queue.put(a.clone(), Duration::from_secs(1)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = queue.get(Duration::from_millis(50)).await;
        assert!(result.is_none());
        assert!(!a.exists());

        queue.stop();
    }
}
