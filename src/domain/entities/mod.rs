//! Domain Entities
//!
//! Core domain entities that have identity and lifecycle.
//! - `DeployRecord` - The persisted state of one in-flight deploy

mod record;

pub use record::{keys, DeployRecord};
