//! Git adapters
//!
//! `GitCli` shells out to the `git` binary inside one working checkout of
//! the deployed repository; `GitVersionNamer` turns a revision into the
//! dated deploy-version identifier. Both assume a single configured remote.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::domain::ports::{VersionControl, VersionNamer};
use crate::error::{BatonError, BatonResult};

fn run_git(repo_dir: &Path, args: &[&str]) -> BatonResult<String> {
    tracing::debug!(?args, dir = %repo_dir.display(), "git");
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let message = if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        };
        return Err(BatonError::Git {
            command: args.first().copied().unwrap_or("git").to_string(),
            message,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Exit status of `git <args>`, for commands where failure is an answer
fn probe_git(repo_dir: &Path, args: &[&str]) -> BatonResult<bool> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()?;
    Ok(output.status.success())
}

/// `git` binary driver for the `VersionControl` port
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    remote: String,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
        }
    }

    fn run(&self, args: &[&str]) -> BatonResult<String> {
        run_git(&self.repo_dir, args)
    }
}

impl VersionControl for GitCli {
    fn fetch_branch(&self, branch: &str) -> BatonResult<()> {
        let refspec = format!(
            "+refs/heads/{}:refs/remotes/{}/{}",
            branch, self.remote, branch
        );
        self.run(&["fetch", &self.remote, &refspec])?;
        Ok(())
    }

    fn checkout(&self, rev: &str) -> BatonResult<()> {
        self.run(&["checkout", rev, "--"])?;
        Ok(())
    }

    fn reset_hard(&self, rev: &str) -> BatonResult<()> {
        self.run(&["reset", "--hard", rev])?;
        Ok(())
    }

    fn merge(&self, rev: &str) -> BatonResult<()> {
        self.run(&["merge", rev])?;
        Ok(())
    }

    fn merge_abort(&self) -> BatonResult<()> {
        self.run(&["merge", "--abort"])?;
        Ok(())
    }

    fn push(&self, branch: &str) -> BatonResult<()> {
        self.run(&["push", &self.remote, branch])?;
        Ok(())
    }

    fn push_with_tags(&self, branch: &str) -> BatonResult<()> {
        self.run(&["push", &self.remote, branch, "--tags"])?;
        Ok(())
    }

    fn push_tags(&self) -> BatonResult<()> {
        self.run(&["push", &self.remote, "--tags"])?;
        Ok(())
    }

    fn rev_parse(&self, rev: &str) -> BatonResult<String> {
        self.run(&["rev-parse", rev])
    }

    fn merge_base(&self, a: &str, b: &str) -> BatonResult<String> {
        self.run(&["merge-base", a, b])
    }

    fn remote_branch_exists(&self, branch: &str) -> BatonResult<bool> {
        // Asks the local repo about its remote-tracking ref, so no network.
        let tracking = format!("{}/{}", self.remote, branch);
        probe_git(
            &self.repo_dir,
            &["ls-remote", "--exit-code", ".", &tracking],
        )
    }

    fn show_refs(&self) -> BatonResult<Vec<String>> {
        let out = self.run(&["show-ref"])?;
        Ok(out
            .lines()
            .filter_map(|line| line.split_whitespace().nth(1))
            .map(str::to_string)
            .collect())
    }

    fn create_tag(&self, name: &str, message: &str, commit: &str) -> BatonResult<()> {
        self.run(&["tag", "-m", message, name, commit])?;
        Ok(())
    }

    fn tag_exists(&self, name: &str) -> BatonResult<bool> {
        let out = self.run(&["tag", "-l", name])?;
        Ok(!out.is_empty())
    }
}

/// Dated version names (`yymmdd-hhmm-<short-sha>`) from the committer date
///
/// A revision that names a branch known to the remote is fetched first, so
/// the version reflects the remote tip rather than a stale local one.
#[derive(Debug, Clone)]
pub struct GitVersionNamer {
    repo_dir: PathBuf,
    remote: String,
}

impl GitVersionNamer {
    pub fn new(repo_dir: impl Into<PathBuf>, remote: impl Into<String>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            remote: remote.into(),
        }
    }
}

impl VersionNamer for GitVersionNamer {
    fn version_for(&self, revision: &str) -> BatonResult<String> {
        if revision.is_empty() {
            return Err(BatonError::InvalidInput(
                "no revision to name a version for".to_string(),
            ));
        }

        let tracking = format!("{}/{}", self.remote, revision);
        let target = if probe_git(
            &self.repo_dir,
            &["ls-remote", "--exit-code", ".", &tracking],
        )? {
            let refspec = format!("+refs/heads/{}:refs/remotes/{}", revision, tracking);
            run_git(&self.repo_dir, &["fetch", &self.remote, &refspec])?;
            tracking
        } else {
            revision.to_string()
        };

        let stamp = run_git(
            &self.repo_dir,
            &[
                "log",
                "-1",
                "--format=%cd",
                "--date=format:%y%m%d-%H%M",
                &target,
            ],
        )?;
        let short = run_git(&self.repo_dir, &["rev-parse", "--short", &target])?;
        Ok(format!("{}-{}", stamp, short))
    }
}
