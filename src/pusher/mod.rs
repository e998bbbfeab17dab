//! Muxer Feed / Pusher (C9)
//!
//! Owns the named transport channel and the long-running push child that
//! reads from it. Runs the `[INIT] -> [STREAMING] -> ([REPEAT LAST] |
//! [RECOVER])` state machine described for the pusher: a broken channel
//! write tears the whole loop down and re-enters `INIT`, recreating the
//! channel and respawning the push child.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{info, warn};

use crate::errors::{ProcessError, PusherError};
use crate::queue::ClipQueue;

/// Runs until `stop` is set, restarting the channel and push child on any
/// broken-pipe condition. Only returns early on the first channel creation
/// failure — anything after that is treated as transient and retried.
pub async fn run(
    queue: Arc<ClipQueue>,
    channel_path: PathBuf,
    sink_url: String,
    ffmpeg_command: String,
    get_timeout: Duration,
    idle_sleep: Duration,
    recover_sleep: Duration,
    chunk_bytes: usize,
    stop: Arc<AtomicBool>,
) -> Result<(), PusherError> {
    while !stop.load(Ordering::Relaxed) {
        ensure_channel(&channel_path)?;

        let mut child = spawn_push_child(&ffmpeg_command, &channel_path, &sink_url)?;
        info!("pusher: push child started");

        let mut channel = match File::options().write(true).open(&channel_path).await {
            Ok(file) => file,
            Err(err) => {
                warn!("pusher: failed to open channel for writing: {}", err);
                let _ = child.start_kill();
                tokio::time::sleep(recover_sleep).await;
                continue;
            }
        };
        info!("pusher: channel opened, streaming");

        let outcome = stream_loop(
            &queue,
            &mut channel,
            get_timeout,
            idle_sleep,
            chunk_bytes,
            &stop,
        )
        .await;

        let _ = child.start_kill();

        if let Err(err) = outcome {
            warn!("pusher: broken pipe ({}), restarting", err);
            tokio::time::sleep(recover_sleep).await;
        }
    }

    Ok(())
}

async fn stream_loop(
    queue: &ClipQueue,
    channel: &mut File,
    get_timeout: Duration,
    idle_sleep: Duration,
    chunk_bytes: usize,
    stop: &AtomicBool,
) -> std::io::Result<()> {
    while !stop.load(Ordering::Relaxed) {
        match queue.get(get_timeout).await {
            Some(clip) => {
                if tokio::fs::try_exists(&clip.path).await.unwrap_or(false) {
                    stream_file(&clip.path, channel, chunk_bytes).await?;
                    let _ = tokio::fs::remove_file(&clip.path).await;
                } else {
                    warn!("pusher: dequeued clip vanished: {}", clip.path.display());
                }
            }
            None => {
                let last = queue.last().await;
                let has_repeatable = match &last {
                    Some(clip) => tokio::fs::try_exists(&clip.path).await.unwrap_or(false),
                    None => false,
                };
                if let (true, Some(clip)) = (has_repeatable, last) {
                    info!("pusher: queue empty, repeating last clip");
                    stream_file(&clip.path, channel, chunk_bytes).await?;
                } else {
                    tokio::time::sleep(idle_sleep).await;
                }
            }
        }
    }
    Ok(())
}

async fn stream_file(path: &Path, channel: &mut File, chunk_bytes: usize) -> std::io::Result<()> {
    let mut file = File::open(path).await?;
    let mut buf = vec![0u8; chunk_bytes];
    loop {
        let read = file.read(&mut buf).await?;
        if read == 0 {
            break;
        }
        channel.write_all(&buf[..read]).await?;
    }
    Ok(())
}

fn ensure_channel(channel_path: &Path) -> Result<(), PusherError> {
    if let Some(parent) = channel_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PusherError::ChannelSetupFailed {
            path: channel_path.display().to_string(),
            source,
        })?;
    }

    match std::fs::symlink_metadata(channel_path) {
        Ok(metadata) => {
            use std::os::unix::fs::FileTypeExt;
            if metadata.file_type().is_fifo() {
                return Ok(());
            }
            std::fs::remove_file(channel_path).map_err(|source| {
                PusherError::ChannelSetupFailed {
                    path: channel_path.display().to_string(),
                    source,
                }
            })?;
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(PusherError::ChannelSetupFailed {
                path: channel_path.display().to_string(),
                source,
            });
        }
    }

    nix::unistd::mkfifo(channel_path, nix::sys::stat::Mode::from_bits_truncate(0o644)).map_err(
        |errno| PusherError::ChannelSetupFailed {
            path: channel_path.display().to_string(),
            source: std::io::Error::from_raw_os_error(errno as i32),
        },
    )
}

fn spawn_push_child(
    ffmpeg_command: &str,
    channel_path: &Path,
    sink_url: &str,
) -> Result<tokio::process::Child, ProcessError> {
    let args = vec![
        "-re".to_string(),
        "-i".to_string(),
        channel_path.display().to_string(),
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
        "-g".to_string(),
        "60".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "96k".to_string(),
        "-ar".to_string(),
        "44100".to_string(),
        "-ac".to_string(),
        "2".to_string(),
        "-f".to_string(),
        "flv".to_string(),
        sink_url.to_string(),
    ];

    tokio::process::Command::new(ffmpeg_command)
        .args(&args)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|source| ProcessError::SpawnFailed {
            command: ffmpeg_command.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_channel_creates_a_fifo_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mux.ts");

        ensure_channel(&path).unwrap();
        assert!(path.exists());

        use std::os::unix::fs::FileTypeExt;
        let meta = std::fs::symlink_metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());

        ensure_channel(&path).unwrap();
        let meta_again = std::fs::symlink_metadata(&path).unwrap();
        assert!(meta_again.file_type().is_fifo());
    }

    #[test]
    fn ensure_channel_replaces_a_stray_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mux.ts");
        std::fs::write(&path, b"not a fifo").unwrap();

        ensure_channel(&path).unwrap();

        use std::os::unix::fs::FileTypeExt;
        let meta = std::fs::symlink_metadata(&path).unwrap();
        assert!(meta.file_type().is_fifo());
    }
}
