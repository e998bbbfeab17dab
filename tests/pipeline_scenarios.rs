//! Cross-component scenarios that don't need a real ffmpeg/ffprobe binary:
//! playlist pool swap atomicity under concurrent readers, and the
//! queue/backpressure/janitor interplay around the hysteresis thresholds.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clip_relay::backpressure;
use clip_relay::playlist::PlaylistStore;
use clip_relay::queue::ClipQueue;

#[tokio::test]
async fn concurrent_readers_never_see_a_torn_pool_during_a_swap() {
    let store = PlaylistStore::new((0..100).map(|n| n.to_string()).collect());

    let reader_store = store.clone();
    let reader = tokio::spawn(async move {
        for _ in 0..500 {
            let snapshot = reader_store.snapshot().await;
            assert!(snapshot.len() == 100 || snapshot.len() == 3);
        }
    });

    store.replace(vec!["a".into(), "b".into(), "c".into()]).await;
    reader.await.unwrap();
}

#[tokio::test]
async fn queue_depth_drives_backpressure_which_gates_new_enqueues() {
    let queue = ClipQueue::new(14, Duration::from_secs(30), Duration::from_secs(10));
    let paused = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));

    let dir = tempfile::tempdir().unwrap();
    for i in 0..14 {
        let path = dir.path().join(format!("clip_{i}.ts"));
        tokio::fs::write(&path, b"x").await.unwrap();
        queue.put(path, Duration::from_secs(1)).await.unwrap();
    }

    let monitor_queue = queue.clone();
    let monitor_paused = paused.clone();
    let monitor_stop = stop.clone();
    let monitor = tokio::spawn(async move {
        backpressure::run(
            monitor_queue,
            monitor_paused,
            14,
            7,
            Duration::from_millis(10),
            monitor_stop,
        )
        .await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(paused.load(Ordering::Relaxed), "queue at capacity should pause workers");

    let overflow = dir.path().join("overflow.ts");
    tokio::fs::write(&overflow, b"x").await.unwrap();
    let result = queue.put(overflow.clone(), Duration::from_millis(50)).await;
    assert!(result.is_err(), "a full queue should reject new clips rather than grow unbounded");

    stop.store(true, Ordering::Relaxed);
    let _ = tokio::time::timeout(Duration::from_millis(100), monitor).await;
    queue.stop();
}
