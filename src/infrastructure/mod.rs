//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `store` - deploy record persistence (`PropFileStore`)
//! - `git` - version control and version naming over the `git` binary
//! - `notify` - chat webhook delivery and people-directory lookup
//! - `platform` - hosting-platform commands and the live-version query
//! - `clock` - wall time

pub mod clock;
pub mod git;
mod http;
pub mod notify;
pub mod platform;
pub mod store;

// Re-export for convenience
pub use clock::SystemClock;
pub use git::{GitCli, GitVersionNamer};
pub use notify::{ChatDirectory, ChatNotifier};
pub use platform::{CommandExecutor, HttpPlatformQuery};
pub use store::PropFileStore;
