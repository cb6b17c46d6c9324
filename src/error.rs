//! Error types for Baton
//!
//! One `thiserror` enum for everything below the CLI boundary. Token and
//! transition mismatches are not here: the dispatcher absorbs those as
//! outcomes rather than raising (see `application::pipeline`).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Baton operations
pub type BatonResult<T> = Result<T, BatonError>;

/// Main error type for Baton operations
#[derive(Error, Debug)]
pub enum BatonError {
    /// No deploy record where one was expected
    #[error("no deploy record found in {dir}")]
    NotFound { dir: PathBuf },

    /// Record's self-referential lock path disagrees with where it was read
    #[error("deploy record in {dir} names a different lock directory: '{recorded}'")]
    Corrupt { dir: PathBuf, recorded: String },

    /// Gave up waiting for the deploy lock
    #[error("gave up waiting for lock {dir} after {waited_secs}s")]
    LockTimeout { dir: PathBuf, waited_secs: u64 },

    /// Release could not delete or rename the lock directory
    #[error("failed to release lock {dir}: {source}")]
    LockReleaseFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Lock directory already exists (relock raced with a new acquire)
    #[error("lock directory {dir} already exists")]
    AlreadyLocked { dir: PathBuf },

    /// Operation does not apply to the current on-disk state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Caller-supplied revision or branch is unusable
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Checkout landed on a different commit than the resolved revision
    #[error("checked out commit {actual} but expected {expected}")]
    HeadMismatch { expected: String, actual: String },

    /// Merge hit conflicts and was aborted
    #[error("merging into '{branch}' hit conflicts; merge aborted")]
    MergeConflict { branch: String },

    /// Remote branch moved between fetch and push
    #[error("remote '{branch}' changed while we worked; push rejected")]
    ConcurrentModification { branch: String },

    /// Post-switch monitoring detected a regression
    #[error("monitoring detected a regression: {0}")]
    MonitoringFailed(String),

    /// External deploy executor reported failure
    #[error("deploy executor failed during {step}: {message}")]
    ExecutorFailed { step: String, message: String },

    /// Rollback did not complete; manual intervention required
    #[error("rollback of version {version} did not complete")]
    RollbackFailed { version: String },

    /// Unparseable or unreadable config file
    #[error("invalid config {file}: {message}")]
    InvalidConfig { file: PathBuf, message: String },

    /// A git subprocess failed
    #[error("git {command} failed: {message}")]
    Git { command: String, message: String },

    /// Notification delivery failed
    #[error("notification delivery failed: {0}")]
    Notify(String),

    /// HTTP error from a collaborator endpoint
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
