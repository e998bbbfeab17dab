//! Centralized error handling for the clip relay scheduler
//!
//! This module unifies error types across the scheduler's components and
//! keeps error reporting consistent with how each layer is allowed to react:
//! workers and the pusher absorb almost everything locally, and only boot-time
//! configuration failures are meant to propagate out of `main`.

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Results from the clip queue
pub type QueueResult<T> = Result<T, QueueError>;

/// Convenience type alias for Results from the process runner
pub type ProcessResult<T> = Result<T, ProcessError>;
