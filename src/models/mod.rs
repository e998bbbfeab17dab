//! Core data types shared across the scheduler.

use std::path::PathBuf;
use std::time::Instant;

/// A handle to a normalized clip file on disk plus the instant it entered
/// the queue.
#[derive(Debug, Clone)]
pub struct Clip {
    pub path: PathBuf,
    pub enqueued_at: Instant,
}

impl Clip {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            enqueued_at: Instant::now(),
        }
    }

    /// A clip is fresh iff it has not outlived `stale` since it was enqueued.
    pub fn is_fresh(&self, stale: std::time::Duration) -> bool {
        self.enqueued_at.elapsed() <= stale
    }
}

/// The outcome of running an external child process with a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus {
    pub code: i32,
}

impl ExitStatus {
    /// Conventional timeout exit code, matching the process runner contract.
    pub const TIMEOUT: i32 = 124;

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn timed_out(&self) -> bool {
        self.code == Self::TIMEOUT
    }
}
