//! Pipeline Invocation
//!
//! Input types for the dispatcher: one stage invocation as it arrives from
//! the CLI, and the slice of configuration the dispatcher threads into
//! fresh records.

use std::path::PathBuf;

use crate::domain::value_objects::Action;

/// One stage invocation
///
/// Every run of the binary is exactly one of these. Most fields only matter
/// for particular stages (`deployer`/`revision` seed a fresh record on
/// `acquire-lock`, `caller` attributes `force-unlock`); the rest of the
/// state lives in the persisted record.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Stage to run
    pub action: Action,
    /// Lock directory; its existence is lock ownership
    pub lock_dir: PathBuf,
    /// Ownership token; empty skips the ownership check
    pub token: String,
    /// Identity of the person deploying (acquire-lock only)
    pub deployer: String,
    /// Branch or commit-ish to deploy (acquire-lock only)
    pub revision: String,
    /// Skip the manual gate and auto-rollback on regressions
    pub auto_deploy: bool,
    /// Version to roll back to if this deploy goes bad (acquire-lock only)
    pub rollback_to: String,
    /// Monitoring window after the traffic switch, in minutes
    pub monitor_minutes: u32,
    /// URL of the job-runner build running this invocation, if any
    pub build_url: Option<String>,
    /// Identity of whoever invoked an unlock/relock by hand
    pub caller: String,
}

impl Invocation {
    pub fn new(action: Action, lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            action,
            lock_dir: lock_dir.into(),
            token: String::new(),
            deployer: String::new(),
            revision: String::new(),
            auto_deploy: false,
            rollback_to: String::new(),
            monitor_minutes: 0,
            build_url: None,
            caller: String::new(),
        }
    }
}

/// Configuration the dispatcher seeds into records it creates
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Chat room for all notifications
    pub chat_room: String,
    /// Displayed sender of all notifications
    pub chat_sender: String,
    /// Base URL of the job runner; action links point here
    pub runner_url: String,
    /// Platform identity deploys run as
    pub deploy_user: String,
    /// File holding the deploy identity's secret
    pub credential_file: PathBuf,
    /// Preview URL template; `{version}` is replaced with the deploy version
    pub preview_url: String,
}

impl PipelineSettings {
    /// Preview URL for a staged version; empty if no template is configured
    pub fn preview_url_for(&self, version: &str) -> String {
        if self.preview_url.is_empty() {
            return String::new();
        }
        self.preview_url.replace("{version}", version)
    }
}
