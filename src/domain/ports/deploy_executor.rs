//! DeployExecutor port - hosting-platform operations around a traffic switch
//!
//! The pipeline never talks to the platform directly; it primes instances,
//! flips traffic, and watches monitoring through this interface. Credentials
//! travel as an explicit reference (user plus secret file), never as ambient
//! state and never on a command line.

use std::path::PathBuf;

use crate::error::BatonResult;

/// Who to deploy as, and where their secret lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRef {
    pub user: String,
    pub secret_file: PathBuf,
}

/// Opaque pre-switch monitoring snapshot, handed back to the watch call
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MonitoringBaseline(pub serde_json::Value);

/// Outcome of watching the monitoring window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchVerdict {
    Healthy,
    /// Metrics regressed against the baseline; the reason is human-readable
    RegressionDetected(String),
}

/// Abstract deploy/traffic operations
///
/// Implementations:
/// - `CommandExecutor` - shells out to the configured deploy/monitor tools
pub trait DeployExecutor: Send + Sync {
    /// Warm serving instances of a version before it takes traffic
    fn prime_instances(&self, version: &str, count: u32) -> BatonResult<()>;

    /// Point live traffic at a version
    fn switch_live(&self, version: &str, credentials: &CredentialRef) -> BatonResult<()>;

    /// Snapshot monitoring state covering the trailing window
    fn monitoring_baseline(&self, window_minutes: u32) -> BatonResult<MonitoringBaseline>;

    /// Watch logs/metrics for the window, comparing against the baseline
    ///
    /// A detected regression is a verdict, not an error; errors mean the
    /// watching itself failed.
    fn watch_for_regressions(
        &self,
        version: &str,
        window_minutes: u32,
        baseline: &MonitoringBaseline,
    ) -> BatonResult<WatchVerdict>;
}
