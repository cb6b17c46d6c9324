//! VersionControl port - the narrow slice of git the pipeline needs
//!
//! All operations run against one working checkout of the deployed
//! repository with a single configured remote. Branch arguments are plain
//! names (`stable`, `feature-x`); revision arguments are anything
//! `rev-parse` accepts.

use crate::error::BatonResult;

/// Abstract version-control operations
///
/// Implementations:
/// - `GitCli` - shells out to the `git` binary
pub trait VersionControl: Send + Sync {
    /// Fetch one branch from the remote into its remote-tracking ref
    fn fetch_branch(&self, branch: &str) -> BatonResult<()>;

    /// Check out a branch or commit-ish
    fn checkout(&self, rev: &str) -> BatonResult<()>;

    /// Hard-reset the working tree to a revision
    fn reset_hard(&self, rev: &str) -> BatonResult<()>;

    /// Merge a revision into the current branch
    fn merge(&self, rev: &str) -> BatonResult<()>;

    /// Abort an in-progress merge; best effort
    fn merge_abort(&self) -> BatonResult<()>;

    /// Push the current branch to the remote
    fn push(&self, branch: &str) -> BatonResult<()>;

    /// Push the current branch plus all tags
    fn push_with_tags(&self, branch: &str) -> BatonResult<()>;

    /// Push only tags
    fn push_tags(&self) -> BatonResult<()>;

    /// Resolve a revision to a full commit SHA
    fn rev_parse(&self, rev: &str) -> BatonResult<String>;

    /// Nearest common ancestor of two revisions
    fn merge_base(&self, a: &str, b: &str) -> BatonResult<String>;

    /// Whether the remote has a branch of this name
    fn remote_branch_exists(&self, branch: &str) -> BatonResult<bool>;

    /// All known ref names (local and remote-tracking)
    fn show_refs(&self) -> BatonResult<Vec<String>>;

    /// Create an annotated tag at a commit; fails if the tag exists
    fn create_tag(&self, name: &str, message: &str, commit: &str) -> BatonResult<()>;

    /// Whether a tag of this name exists
    fn tag_exists(&self, name: &str) -> BatonResult<bool>;
}
