//! Buffer Janitor (C8)
//!
//! Reconciles the buffer directory with what the queue actually references,
//! cleaning up crash-recovery leftovers and rename races that the queue's
//! own stale-eviction sweep never sees (files dropped on enqueue failure,
//! orphans from a previous run).

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::queue::ClipQueue;

pub async fn run(
    queue: Arc<ClipQueue>,
    buffer_dir: PathBuf,
    channel_filename: String,
    buffer_cleanup: Duration,
    interval: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(interval);
    while !stop.load(Ordering::Relaxed) {
        ticker.tick().await;
        if stop.load(Ordering::Relaxed) {
            break;
        }
        sweep(&queue, &buffer_dir, &channel_filename, buffer_cleanup).await;
    }
}

async fn sweep(
    queue: &ClipQueue,
    buffer_dir: &Path,
    channel_filename: &str,
    buffer_cleanup: Duration,
) {
    let referenced = referenced_paths(queue).await;

    let mut entries = match tokio::fs::read_dir(buffer_dir).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!("buffer janitor could not read {}: {}", buffer_dir.display(), err);
            return;
        }
    };

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(err) => {
                warn!("buffer janitor directory scan failed: {}", err);
                break;
            }
        };

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("ts") {
            continue;
        }
        if path.file_name().and_then(|n| n.to_str()) == Some(channel_filename) {
            continue;
        }
        if referenced.contains(&path) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(_) => continue,
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .unwrap_or(Duration::ZERO);

        if age > buffer_cleanup {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("buffer janitor removed orphan {}", path.display()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!("buffer janitor failed to remove {}: {}", path.display(), err),
            }
        }
    }
}

async fn referenced_paths(queue: &ClipQueue) -> HashSet<PathBuf> {
    let mut referenced = queue.snapshot_paths().await;
    if let Some(last) = queue.last().await {
        referenced.insert(last.path);
    }
    referenced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test(tokio::test)]
    async fn removes_old_unreferenced_clip_but_keeps_fresh_and_referenced_ones() {
        let dir = tempfile::tempdir().unwrap();
        let queue = ClipQueue::new(14, Duration::from_secs(30), Duration::from_secs(10));

        let referenced_path = dir.path().join("referenced.ts");
        tokio::fs::write(&referenced_path, b"x").await.unwrap();
        queue
            .put(referenced_path.clone(), Duration::from_secs(1))
            .await
            .unwrap();

        let orphan_old = dir.path().join("orphan_old.ts");
        tokio::fs::write(&orphan_old, b"x").await.unwrap();
        set_mtime_in_past(&orphan_old, Duration::from_secs(1000)).await;

        let orphan_fresh = dir.path().join("orphan_fresh.ts");
        tokio::fs::write(&orphan_fresh, b"x").await.unwrap();

        let channel = dir.path().join("mux.ts");
        tokio::fs::write(&channel, b"x").await.unwrap();
        set_mtime_in_past(&channel, Duration::from_secs(1000)).await;

        sweep(&queue, dir.path(), "mux.ts", Duration::from_secs(120)).await;

        assert!(referenced_path.exists());
        assert!(!orphan_old.exists());
        assert!(orphan_fresh.exists());
        assert!(channel.exists());

        queue.stop();
    }

    async fn set_mtime_in_past(path: &Path, age: Duration) {
        let past = SystemTime::now() - age;
        let file = std::fs::File::open(path).unwrap();
        file.set_modified(past).unwrap();
    }
}
