//! Application Layer
//!
//! Use cases that orchestrate the pipeline flow.
//! This layer:
//! - Depends on Domain layer (entities, services, ports)
//! - Does NOT contain business rules (those are in Domain)
//! - Coordinates between Infrastructure and Domain
//!
//! ## Use Cases
//!
//! - `Pipeline` - Validates and dispatches one stage invocation
//! - `LockManager` - Acquires, releases and restores the deploy lock
//! - `PropertyStore` - Record lifecycle with derived-field propagation
//! - `BranchSync` - Reconciles the release revision with the stable branch
//! - `RollbackController` - Monitoring window around the traffic switch,
//!   best-effort rollback
//!
//! ## Services
//!
//! - `alerts` - Notification building over the `Notifier` port
//! - `links` - Recovery links that re-invoke the pipeline

pub mod alerts;
pub mod branch_sync;
pub mod links;
pub mod lock;
pub mod pipeline;
pub mod props;
pub mod rollback;

pub use alerts::Alert;
pub use branch_sync::BranchSync;
pub use lock::{LockManager, LockSettings};
pub use pipeline::{DispatchOutcome, Invocation, Pipeline, PipelineSettings};
pub use props::{PropertyStore, RecordSeed};
pub use rollback::RollbackController;
