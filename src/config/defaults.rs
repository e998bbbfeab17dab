//! Configuration default values
//!
//! This module contains all the default values for configuration options,
//! making them easily changeable in one central location.

// Buffer directory defaults
pub const DEFAULT_BUFFER_DIR: &str = "./data/buffer";
pub const DEFAULT_BLOCKLIST_PATH: Option<&str> = None;

// Worker pool
pub const DEFAULT_WORKERS: usize = 4;

// Clip queue tuning
pub const DEFAULT_MAX_QUEUE: usize = 14;
pub const DEFAULT_MIN_QUEUE: usize = 7;
pub const DEFAULT_STALE_SEC: u64 = 30;
pub const DEFAULT_CLEANUP_INTERVAL_SEC: u64 = 10;
pub const DEFAULT_BUFFER_CLEANUP_SEC: u64 = 120;

// Backpressure monitor poll cadence
pub const DEFAULT_BACKPRESSURE_POLL_SEC: u64 = 2;

// Buffer janitor sweep cadence
pub const DEFAULT_JANITOR_INTERVAL_SEC: u64 = 60;

// Capture worker
pub const DEFAULT_CLIP_LENGTH_CYCLE: [u64; 3] = [5, 7, 11];
pub const DEFAULT_PROBE_TIMEOUT_SEC: u64 = 3;
pub const DEFAULT_PROBE_SLACK_SEC: u64 = 3;
pub const DEFAULT_CAPTURE_SLACK_SEC: u64 = 20;
pub const DEFAULT_ENQUEUE_TIMEOUT_SEC: u64 = 5;
pub const DEFAULT_MIN_CLIP_BYTES: u64 = 100_000;

// Playlist loader
pub const DEFAULT_PLAYLIST_FETCH_TIMEOUT_SEC: u64 = 10;

// Pusher
pub const DEFAULT_PUSHER_GET_TIMEOUT_SEC: u64 = 5;
pub const DEFAULT_PUSHER_IDLE_SLEEP_SEC: u64 = 1;
pub const DEFAULT_PUSHER_RECOVER_SLEEP_SEC: u64 = 1;
pub const DEFAULT_CHANNEL_CHUNK_BYTES: usize = 1024 * 1024;
pub const DEFAULT_CHANNEL_FILENAME: &str = "mux.ts";

// External binaries
pub const DEFAULT_FFMPEG_COMMAND: &str = "ffmpeg";
pub const DEFAULT_FFPROBE_COMMAND: &str = "ffprobe";
