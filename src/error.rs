//! Crate error types.
//!
//! All fallible operations return [`DaqLogError`] through the [`Result`]
//! alias. Worker loops are fail-fast: the first error terminates the loop and
//! is surfaced through `stop_and_join()` and the worker's last-error slot
//! rather than being retried in place.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, DaqLogError>;

/// Primary error type for the acquisition/logging engine.
#[derive(Debug, Error)]
pub enum DaqLogError {
    /// A configuration value failed validation at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `start()` was called on a worker that has already been started.
    /// Workers are single-use; a stopped worker cannot be restarted either.
    #[error("worker '{0}' already started")]
    AlreadyStarted(&'static str),

    /// The worker thread panicked instead of returning.
    #[error("worker '{0}' panicked")]
    WorkerPanicked(&'static str),

    /// A dequeued sample had fewer values than the configured column count.
    /// Extra values are truncated, but missing ones are a caller error and
    /// terminate the handler.
    #[error("sample has {got} columns, {expected} required")]
    ShortSample {
        /// Configured column count.
        expected: usize,
        /// Values actually present in the sample.
        got: usize,
    },

    /// The injected sample source failed. Recovery policy (reconnect, retry)
    /// belongs to the source itself, not the acquisition loop.
    #[error("sample source failed: {0}")]
    Source(anyhow::Error),

    /// File I/O failure while writing the log.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for DaqLogError {
    fn from(err: anyhow::Error) -> Self {
        Self::Source(err)
    }
}
