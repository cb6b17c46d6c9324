//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod action;

pub use action::{Action, NextActions, WILDCARD};
