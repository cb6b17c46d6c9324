//! Configuration module for Baton
//!
//! Configuration hierarchy, highest priority first:
//! 1. CLI flags (`--lock-dir`, `--monitor-minutes`, ...)
//! 2. Explicit `--config <file>`
//! 3. Project config (`./baton.toml`)
//! 4. User config (`~/.config/baton/config.toml`)
//! 5. Built-in defaults
//!
//! Unknown keys warn (with a did-you-mean suggestion) instead of erroring,
//! so a config written for a newer baton still loads on an older one.

mod loader;
mod types;

pub use loader::{expand_tilde, ConfigWarning, PROJECT_CONFIG};
pub use types::{ChatConfig, Config, GitConfig, LockConfig, PlatformConfig, RunnerConfig};
