//! Pipeline Module
//!
//! Top-level dispatcher for pipeline stage invocations.
//!
//! ## Structure
//!
//! - `invocation` - Input types (`Invocation`, `PipelineSettings`)
//! - `outcome` - Result type (`DispatchOutcome`)
//! - `use_case` - Dispatch logic and stage handlers (`Pipeline`)
//!
//! ## Usage
//!
//! ```ignore
//! use baton::application::pipeline::{Invocation, Pipeline};
//! use baton::domain::value_objects::Action;
//!
//! let pipeline = Pipeline::new(props, lock, sync, rollback, vcs, platform, notifier, settings);
//! let outcome = pipeline.dispatch(&Invocation::new(Action::AcquireLock, "tmp/deploy.lock"));
//! std::process::exit(if outcome.success() { 0 } else { 1 });
//! ```

mod invocation;
mod outcome;
mod use_case;

pub use invocation::{Invocation, PipelineSettings};
pub use outcome::DispatchOutcome;
pub use use_case::Pipeline;
