//! Configuration loading and validation
//!
//! Boot-time configuration is layered the way this codebase always layers it:
//! built-in defaults (`defaults` module) < an optional TOML file < explicit
//! CLI flags. The result is validated once, here, before the supervisor
//! spawns a single task — nothing downstream re-reads a file or second-guesses
//! a tunable.

pub mod defaults;

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Tunable constants for the scheduler. Every field has a spec-mandated
/// default (see `defaults`); operators may override individual values via
/// the TOML config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub workers: usize,
    pub max_queue: usize,
    pub min_queue: usize,
    pub stale_sec: u64,
    pub cleanup_interval_sec: u64,
    pub buffer_cleanup_sec: u64,
    pub backpressure_poll_sec: u64,
    pub janitor_interval_sec: u64,
    pub clip_length_cycle: [u64; 3],
    pub probe_timeout_sec: u64,
    pub probe_slack_sec: u64,
    pub capture_slack_sec: u64,
    pub enqueue_timeout_sec: u64,
    pub min_clip_bytes: u64,
    pub playlist_fetch_timeout_sec: u64,
    pub pusher_get_timeout_sec: u64,
    pub pusher_idle_sleep_sec: u64,
    pub pusher_recover_sleep_sec: u64,
    pub channel_chunk_bytes: usize,
    pub channel_filename: String,
    pub ffmpeg_command: String,
    pub ffprobe_command: String,
}

impl Default for Tuning {
    fn default() -> Self {
        use defaults::*;
        Self {
            workers: DEFAULT_WORKERS,
            max_queue: DEFAULT_MAX_QUEUE,
            min_queue: DEFAULT_MIN_QUEUE,
            stale_sec: DEFAULT_STALE_SEC,
            cleanup_interval_sec: DEFAULT_CLEANUP_INTERVAL_SEC,
            buffer_cleanup_sec: DEFAULT_BUFFER_CLEANUP_SEC,
            backpressure_poll_sec: DEFAULT_BACKPRESSURE_POLL_SEC,
            janitor_interval_sec: DEFAULT_JANITOR_INTERVAL_SEC,
            clip_length_cycle: DEFAULT_CLIP_LENGTH_CYCLE,
            probe_timeout_sec: DEFAULT_PROBE_TIMEOUT_SEC,
            probe_slack_sec: DEFAULT_PROBE_SLACK_SEC,
            capture_slack_sec: DEFAULT_CAPTURE_SLACK_SEC,
            enqueue_timeout_sec: DEFAULT_ENQUEUE_TIMEOUT_SEC,
            min_clip_bytes: DEFAULT_MIN_CLIP_BYTES,
            playlist_fetch_timeout_sec: DEFAULT_PLAYLIST_FETCH_TIMEOUT_SEC,
            pusher_get_timeout_sec: DEFAULT_PUSHER_GET_TIMEOUT_SEC,
            pusher_idle_sleep_sec: DEFAULT_PUSHER_IDLE_SLEEP_SEC,
            pusher_recover_sleep_sec: DEFAULT_PUSHER_RECOVER_SLEEP_SEC,
            channel_chunk_bytes: DEFAULT_CHANNEL_CHUNK_BYTES,
            channel_filename: DEFAULT_CHANNEL_FILENAME.to_string(),
            ffmpeg_command: DEFAULT_FFMPEG_COMMAND.to_string(),
            ffprobe_command: DEFAULT_FFPROBE_COMMAND.to_string(),
        }
    }
}

/// Fully validated, immutable configuration handed to the supervisor.
#[derive(Debug, Clone)]
pub struct Config {
    pub sink_url: String,
    pub playlist_url: String,
    pub blocklist: Vec<String>,
    pub buffer_dir: PathBuf,
    pub tuning: Tuning,
}

impl Config {
    pub fn channel_path(&self) -> PathBuf {
        self.buffer_dir.join(&self.tuning.channel_filename)
    }
}

/// Paths and overrides gathered from the CLI, handed to [`Config::load`].
///
/// Kept separate from the `clap`-derived `Cli` struct in `main.rs` so this
/// module has no dependency on the binary's argument parser.
#[derive(Debug, Clone)]
pub struct ConfigLoadArgs {
    pub sink_url_path: PathBuf,
    pub playlist_url_path: PathBuf,
    pub blocklist_path: Option<PathBuf>,
    pub toml_config_path: Option<PathBuf>,
    pub buffer_dir: Option<PathBuf>,
    pub workers: Option<usize>,
}

impl Config {
    /// Load and validate configuration: defaults < optional TOML file < CLI overrides.
    pub fn load(args: &ConfigLoadArgs) -> Result<Self, ConfigError> {
        let sink_url = read_trimmed(&args.sink_url_path)?;
        if !sink_url.starts_with("rtmp://") {
            return Err(ConfigError::InvalidSinkUrl {
                path: args.sink_url_path.display().to_string(),
            });
        }

        let playlist_url = read_trimmed(&args.playlist_url_path)?;
        let blocklist = match &args.blocklist_path {
            Some(path) if path.exists() => parse_blocklist(&read_trimmed(path)?),
            _ => Vec::new(),
        };

        let mut figment = Figment::from(Serialized::defaults(Tuning::default()));
        if let Some(toml_path) = &args.toml_config_path {
            figment = figment.merge(Toml::file(toml_path));
        }
        let mut tuning: Tuning = figment.extract().unwrap_or_default();

        if let Some(workers) = args.workers {
            tuning.workers = workers;
        }

        let buffer_dir = args
            .buffer_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(defaults::DEFAULT_BUFFER_DIR));

        Ok(Config {
            sink_url,
            playlist_url,
            blocklist,
            buffer_dir,
            tuning,
        })
    }
}

fn read_trimmed(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|source| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source,
        })
}

fn parse_blocklist(body: &str) -> Vec<String> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blocklist_ignoring_comments_and_blanks() {
        let body = "bad\n# comment\n\nBLOCKED\n";
        let entries = parse_blocklist(body);
        assert_eq!(entries, vec!["bad".to_string(), "blocked".to_string()]);
    }

    #[test]
    fn tuning_defaults_match_spec() {
        let tuning = Tuning::default();
        assert_eq!(tuning.max_queue, 14);
        assert_eq!(tuning.min_queue, 7);
        assert_eq!(tuning.stale_sec, 30);
        assert_eq!(tuning.workers, 4);
        assert_eq!(tuning.clip_length_cycle, [5, 7, 11]);
    }
}
