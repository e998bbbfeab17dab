//! Backpressure Monitor (C7)
//!
//! A hysteretic gate on queue depth: pause capture workers once the queue
//! fills to `max_queue`, resume once it drains to `min_queue`. Between the
//! two thresholds the previous state is left unchanged, so the signal
//! doesn't chatter at the boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use crate::queue::ClipQueue;

pub async fn run(
    queue: Arc<ClipQueue>,
    paused: Arc<AtomicBool>,
    max_queue: usize,
    min_queue: usize,
    poll_interval: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut interval = tokio::time::interval(poll_interval);
    while !stop.load(Ordering::Relaxed) {
        interval.tick().await;
        if stop.load(Ordering::Relaxed) {
            break;
        }

        let size = queue.size().await;
        let was_paused = paused.load(Ordering::Relaxed);

        if size >= max_queue && !was_paused {
            paused.store(true, Ordering::Relaxed);
            info!("backpressure: pausing capture workers, queue at {}", size);
        } else if size <= min_queue && was_paused {
            paused.store(false, Ordering::Relaxed);
            info!("backpressure: resuming capture workers, queue at {}", size);
        }
    }
}
