//! Error type definitions for the clip relay scheduler
//!
//! This module defines all error types used throughout the application,
//! providing a hierarchical error system that makes debugging and error
//! handling more straightforward.

use thiserror::Error;

/// Top-level application error type.
///
/// Only fatal configuration errors at boot should ever reach `main` as this
/// type; everything else is absorbed by the component that can make a local
/// decision about it.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration errors (malformed sink URL, missing required file)
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Queue-related errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// An unrecoverable failure in the muxer feed / pusher (e.g. the push
    /// child binary is missing)
    #[error("Pusher error: {0}")]
    Pusher(#[from] PusherError),

    /// A supervised task panicked or was cancelled unexpectedly
    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    /// I/O errors bubbled up from boot-time filesystem setup
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating boot-time configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The sink URL file did not contain a valid `rtmp://` URL
    #[error("invalid sink URL in {path}: must start with rtmp://")]
    InvalidSinkUrl { path: String },

    /// A required configuration file could not be read
    #[error("failed to read {path}: {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the clip queue.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// `put` could not acquire capacity before its timeout elapsed
    #[error("queue full")]
    Full,
}

/// Errors raised by the process runner (C2) when a child cannot even be
/// spawned. A non-zero or timed-out exit is not an error here — it is data
/// the caller inspects via [`crate::process::ExitStatus`].
#[derive(Error, Debug)]
pub enum ProcessError {
    /// The child process could not be spawned at all
    #[error("failed to spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors surfaced by the muxer feed / pusher loop.
#[derive(Error, Debug)]
pub enum PusherError {
    /// The named transport channel could not be (re)created
    #[error("failed to prepare transport channel {path}: {source}")]
    ChannelSetupFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The push child could not be spawned
    #[error("failed to spawn push child: {0}")]
    SpawnFailed(#[from] ProcessError),
}

impl AppError {
    /// Create a configuration error for an invalid sink URL
    pub fn invalid_sink_url<S: Into<String>>(path: S) -> Self {
        Self::Config(ConfigError::InvalidSinkUrl { path: path.into() })
    }
}
