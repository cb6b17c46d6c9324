//! Baton - release pipeline coordination over one durable lock
//!
//! Baton chains independent CI job invocations into one resumable,
//! lock-protected deploy: a directory on disk is the mutex, a property
//! file inside it is the shared state, and every stage validates itself
//! against that record before touching the release.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-exports for convenience
pub use application::{
    BranchSync, DispatchOutcome, Invocation, LockManager, LockSettings, Pipeline,
    PipelineSettings, PropertyStore, RecordSeed, RollbackController,
};
pub use config::Config;
pub use domain::entities::{keys, DeployRecord};
pub use domain::value_objects::{Action, NextActions};
pub use error::{BatonError, BatonResult};
