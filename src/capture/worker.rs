//! Capture Worker (C6)
//!
//! One instance runs per configured worker slot. Each pass picks a random
//! source URL, probes it for a video stream, captures and normalizes a
//! short clip via an external encoder, and hands the result to the queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Tuning;
use crate::playlist::PlaylistStore;
use crate::process::run_with_timeout;
use crate::queue::ClipQueue;

const PAUSE_POLL: Duration = Duration::from_secs(2);
const EMPTY_POOL_POLL: Duration = Duration::from_secs(2);

/// Runs until `stop` is set. `worker_id` only affects log lines and the
/// entropy mixed into generated filenames; workers share no state.
pub async fn run(
    worker_id: usize,
    pool: PlaylistStore,
    queue: Arc<ClipQueue>,
    buffer_dir: PathBuf,
    tuning: Tuning,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
) {
    let mut clip_length_index = 0usize;

    while !stop.load(Ordering::Relaxed) {
        if paused.load(Ordering::Relaxed) {
            tokio::time::sleep(PAUSE_POLL).await;
            continue;
        }

        let urls = pool.snapshot().await;
        if urls.is_empty() {
            tokio::time::sleep(EMPTY_POOL_POLL).await;
            continue;
        }

        let url = {
            use rand::seq::IndexedRandom;
            urls.choose(&mut rand::rng()).cloned()
        };
        let Some(url) = url else {
            tokio::time::sleep(EMPTY_POOL_POLL).await;
            continue;
        };

        let probe_timeout =
            Duration::from_secs(tuning.probe_timeout_sec + tuning.probe_slack_sec);
        let probed = probe(&tuning.ffprobe_command, &url, probe_timeout).await;
        if !probed {
            debug!("worker {}: probe failed for {}", worker_id, url);
            continue;
        }

        let clip_length = tuning.clip_length_cycle[clip_length_index];
        clip_length_index = (clip_length_index + 1) % tuning.clip_length_cycle.len();

        let out_path = buffer_dir.join(format!("clip_{}.ts", unique_suffix()));
        let capture_timeout = Duration::from_secs(clip_length + tuning.capture_slack_sec);

        match capture(
            &tuning.ffmpeg_command,
            &url,
            clip_length,
            &out_path,
            capture_timeout,
            tuning.min_clip_bytes,
        )
        .await
        {
            Ok(true) => {
                let enqueue_timeout = Duration::from_secs(tuning.enqueue_timeout_sec);
                if let Err(err) = queue.put(out_path.clone(), enqueue_timeout).await {
                    warn!("worker {}: {} (dropping clip)", worker_id, err);
                    let _ = tokio::fs::remove_file(&out_path).await;
                }
            }
            Ok(false) => {
                let _ = tokio::fs::remove_file(&out_path).await;
            }
            Err(err) => {
                warn!("worker {}: capture child failed to spawn: {}", worker_id, err);
            }
        }
    }
}

async fn probe(ffprobe_command: &str, url: &str, timeout: Duration) -> bool {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-select_streams".to_string(),
        "v:0".to_string(),
        "-show_entries".to_string(),
        "stream=codec_name".to_string(),
        "-of".to_string(),
        "csv=p=0".to_string(),
        url.to_string(),
    ];

    match run_with_timeout(ffprobe_command, &args, timeout).await {
        Ok(status) => status.success(),
        Err(err) => {
            warn!("probe could not spawn {}: {}", ffprobe_command, err);
            false
        }
    }
}

/// Captures and normalizes `clip_length` seconds of `url` into a temp file
/// next to `out_path`, then renames it into place on success. Returns
/// `Ok(true)` on a usable clip, `Ok(false)` on a transient capture failure
/// (already cleaned up), `Err` only if the child could not be spawned.
async fn capture(
    ffmpeg_command: &str,
    url: &str,
    clip_length: u64,
    out_path: &std::path::Path,
    timeout: Duration,
    min_bytes: u64,
) -> Result<bool, crate::errors::ProcessError> {
    let tmp_path = out_path.with_extension("tmp");

    let args = vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-rw_timeout".to_string(),
        "7000000".to_string(),
        "-i".to_string(),
        url.to_string(),
        "-t".to_string(),
        clip_length.to_string(),
        "-vf".to_string(),
        "scale=-2:720,fps=30".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "veryfast".to_string(),
        "-b:v".to_string(),
        "900k".to_string(),
        "-maxrate".to_string(),
        "1000k".to_string(),
        "-bufsize".to_string(),
        "2000k".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "96k".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-f".to_string(),
        "mpegts".to_string(),
        tmp_path.display().to_string(),
    ];

    let status = run_with_timeout(ffmpeg_command, &args, timeout).await?;

    let usable = status.success()
        && tokio::fs::metadata(&tmp_path)
            .await
            .map(|meta| meta.len() > min_bytes)
            .unwrap_or(false);

    if usable {
        if let Err(err) = tokio::fs::rename(&tmp_path, out_path).await {
            warn!("failed to move captured clip into place: {}", err);
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Ok(false);
        }
        Ok(true)
    } else {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        Ok(false)
    }
}

fn unique_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_suffix_is_eight_hex_chars() {
        let suffix = unique_suffix();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn capture_reports_failure_without_erroring_when_binary_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("clip_test.ts");
        let result = capture(
            "definitely-not-a-real-ffmpeg-xyz",
            "http://example.invalid/stream.m3u8",
            5,
            &out,
            Duration::from_secs(1),
            100_000,
        )
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn probe_returns_false_when_binary_is_missing() {
        let probed = probe(
            "definitely-not-a-real-ffprobe-xyz",
            "http://example.invalid/stream.m3u8",
            Duration::from_secs(1),
        )
        .await;
        assert!(!probed);
    }
}
