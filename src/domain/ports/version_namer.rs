//! VersionNamer port - turns a revision into a deploy-version identifier

use crate::error::BatonResult;

/// Abstract version naming
///
/// Implementations:
/// - `GitVersionNamer` - `yymmdd-hhmm-<short-sha>` from the committer date
pub trait VersionNamer: Send + Sync {
    fn version_for(&self, revision: &str) -> BatonResult<String>;
}
