//! Domain Services
//!
//! Pure business logic services that operate on domain entities.
//! These services have no I/O dependencies and are easily testable.

pub mod transitions;

pub use transitions::{recovery_suggestion, successors, RecoverySuggestion};
