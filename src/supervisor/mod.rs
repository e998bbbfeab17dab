//! Supervisor (C10)
//!
//! Owns the boot sequence: load configuration, stand up the shared queue
//! and playlist pool, spawn every daemon and worker, gate on the warm-up
//! threshold, then hand the main task to the pusher. Shutdown is driven by
//! a single `Arc<AtomicBool>` stop flag that every long-lived task polls
//! between sleeps, plus `tokio::signal` wiring for `SIGINT`/`SIGTERM`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::info;

use crate::config::Config;
use crate::errors::AppResult;
use crate::playlist::{self, PlaylistStore};
use crate::queue::ClipQueue;
use crate::{backpressure, capture, janitor, pusher};

const WARMUP_POLL: Duration = Duration::from_secs(1);

pub async fn run(config: Config) -> AppResult<()> {
    tokio::fs::create_dir_all(&config.buffer_dir).await?;

    let initial_urls = playlist::fetch(
        &config.playlist_url,
        Duration::from_secs(config.tuning.playlist_fetch_timeout_sec),
        &config.blocklist,
    )
    .await;
    let pool = PlaylistStore::new(initial_urls);

    let queue = ClipQueue::new(
        config.tuning.max_queue,
        Duration::from_secs(config.tuning.stale_sec),
        Duration::from_secs(config.tuning.cleanup_interval_sec),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let paused = Arc::new(AtomicBool::new(false));

    let reload_handle = tokio::spawn(playlist::loader::reload_daemon(
        pool.clone(),
        config.playlist_url.clone(),
        config.blocklist.clone(),
        Duration::from_secs(config.tuning.playlist_fetch_timeout_sec),
        stop.clone(),
    ));

    let backpressure_handle = tokio::spawn(backpressure::run(
        queue.clone(),
        paused.clone(),
        config.tuning.max_queue,
        config.tuning.min_queue,
        Duration::from_secs(config.tuning.backpressure_poll_sec),
        stop.clone(),
    ));

    let janitor_handle = tokio::spawn(janitor::run(
        queue.clone(),
        config.buffer_dir.clone(),
        config.tuning.channel_filename.clone(),
        Duration::from_secs(config.tuning.buffer_cleanup_sec),
        Duration::from_secs(config.tuning.janitor_interval_sec),
        stop.clone(),
    ));

    let mut worker_handles = Vec::with_capacity(config.tuning.workers);
    for worker_id in 0..config.tuning.workers {
        worker_handles.push(tokio::spawn(capture::run(
            worker_id,
            pool.clone(),
            queue.clone(),
            config.buffer_dir.clone(),
            config.tuning.clone(),
            paused.clone(),
            stop.clone(),
        )));
    }

    info!(
        "warming buffer until {} clips ready...",
        config.tuning.min_queue
    );
    while queue.size().await < config.tuning.min_queue && !stop.load(Ordering::Relaxed) {
        tokio::time::sleep(WARMUP_POLL).await;
    }
    info!("buffer ready, starting pusher");

    let pusher_stop = stop.clone();
    let pusher_queue = queue.clone();
    let channel_path = config.channel_path();
    let sink_url = config.sink_url.clone();
    let ffmpeg_command = config.tuning.ffmpeg_command.clone();
    let get_timeout = Duration::from_secs(config.tuning.pusher_get_timeout_sec);
    let idle_sleep = Duration::from_secs(config.tuning.pusher_idle_sleep_sec);
    let recover_sleep = Duration::from_secs(config.tuning.pusher_recover_sleep_sec);
    let chunk_bytes = config.tuning.channel_chunk_bytes;

    let mut pusher_handle = tokio::spawn(async move {
        pusher::run(
            pusher_queue,
            channel_path,
            sink_url,
            ffmpeg_command,
            get_timeout,
            idle_sleep,
            recover_sleep,
            chunk_bytes,
            pusher_stop,
        )
        .await
    });

    // The pusher only returns on an unrecoverable channel/push-child setup
    // failure (e.g. the encoder binary is missing) — that's the one pusher
    // error that escalates all the way to a fatal exit, matching the
    // boot-time "required external binary missing" case in the taxonomy.
    let pusher_outcome = tokio::select! {
        result = &mut pusher_handle => Some(result),
        () = wait_for_shutdown_signal() => {
            info!("shutdown signal received, stopping");
            None
        }
    };

    stop.store(true, Ordering::Relaxed);

    for handle in worker_handles {
        let _ = handle.await;
    }
    if pusher_outcome.is_none() {
        let _ = pusher_handle.await;
    }

    // The reload daemon may be sleeping for up to 24h waiting on the next
    // local midnight; it, the backpressure monitor, and the janitor are
    // daemon-style background loops with no state worth flushing, so they're
    // aborted outright rather than joined.
    reload_handle.abort();
    backpressure_handle.abort();
    janitor_handle.abort();
    queue.stop();

    match pusher_outcome {
        Some(Ok(Err(err))) => Err(err.into()),
        Some(Err(join_err)) => Err(join_err.into()),
        _ => Ok(()),
    }
}


#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
