//! BranchSync - keeps the release revision and the stable branch consistent
//!
//! Two mirror operations frame a deploy. Before it, `sync_from_stable`
//! brings everything stable has into the release revision (or proves the
//! revision already contains it). After it, `merge_to_stable` folds the
//! deployed commit back so stable keeps pointing at the last successful
//! deploy. In a world where nobody pushes to stable by hand, the second
//! merge is always a fast-forward because the first one made the release
//! revision a superset.

use std::sync::Arc;

use crate::domain::entities::DeployRecord;
use crate::domain::ports::VersionControl;
use crate::error::{BatonError, BatonResult};

/// Tag placed on every commit that reached live traffic
pub fn release_tag(version: &str) -> String {
    format!("deploy-{}", version)
}

/// Tag placed on a version that was rolled back
pub fn bad_version_tag(version: &str) -> String {
    format!("deploy-{}-bad", version)
}

pub struct BranchSync {
    vcs: Arc<dyn VersionControl>,
    stable_branch: String,
    remote: String,
}

impl BranchSync {
    pub fn new(
        vcs: Arc<dyn VersionControl>,
        stable_branch: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            vcs,
            stable_branch: stable_branch.into(),
            remote: remote.into(),
        }
    }

    /// Bring stable's history into the release revision before deploying
    ///
    /// Returns the commit SHA the deploy should build from: the revision's
    /// tip, or the merge commit if stable had to be merged in. The checkout
    /// is by branch name where possible so later commits to the branch stay
    /// visible and we are not left on a detached head.
    pub fn sync_from_stable(&self, record: &DeployRecord) -> BatonResult<String> {
        let revision = record.revision();
        if revision == self.stable_branch {
            return Err(BatonError::InvalidInput(format!(
                "deploys must start from a branch or commit other than '{}'",
                self.stable_branch
            )));
        }

        // Local stable mirrors the remote before anything is compared
        // against it.
        self.vcs.fetch_branch(&self.stable_branch)?;
        self.vcs.checkout(&self.stable_branch)?;
        self.vcs.reset_hard(&self.remote_ref(&self.stable_branch))?;

        if self.vcs.remote_branch_exists(revision)? {
            // A previous run may have left the local branch at an older
            // commit; pin it to the remote tip.
            self.vcs.fetch_branch(revision)?;
            self.vcs.checkout(revision)?;
            self.vcs.reset_hard(&self.remote_ref(revision))?;
        } else {
            self.vcs.checkout(revision)?;
        }

        let head = self.vcs.rev_parse("HEAD")?;
        let expected = self.vcs.rev_parse(revision)?;
        if head != expected {
            return Err(BatonError::HeadMismatch {
                expected,
                actual: head,
            });
        }

        let stable_commit = self.vcs.rev_parse(&self.stable_branch)?;
        if self.vcs.merge_base(revision, &stable_commit)? == stable_commit {
            tracing::info!(
                "{} already contains all of {}; no merge needed",
                revision,
                self.stable_branch
            );
            return Ok(head);
        }

        // A merge needs a branch to land on. A bare commit-ish that is
        // behind stable cannot be deployed.
        let refs = self.vcs.show_refs()?;
        let wanted = format!("refs/remotes/{}", self.remote_ref(revision));
        if !refs.iter().any(|r| r == &wanted) {
            let mut known: Vec<&str> = refs.iter().map(String::as_str).collect();
            known.sort_unstable();
            return Err(BatonError::InvalidInput(format!(
                "'{}' is not a branch on the remote; known refs:\n  {}",
                revision,
                known.join("\n  ")
            )));
        }

        tracing::info!("merging {} into {}", self.stable_branch, revision);
        if self.vcs.merge(&self.stable_branch).is_err() {
            self.vcs.merge_abort()?;
            return Err(BatonError::MergeConflict {
                branch: revision.to_string(),
            });
        }

        // Someone may have pushed to the branch while we merged; the remote
        // rejects the push and we roll the local branch back to where it
        // was, leaving nothing half-applied.
        if self.vcs.push(revision).is_err() {
            self.vcs.reset_hard(&head)?;
            return Err(BatonError::ConcurrentModification {
                branch: revision.to_string(),
            });
        }

        self.vcs.rev_parse("HEAD")
    }

    /// Fold the deployed commit into stable after a successful deploy
    pub fn merge_to_stable(&self, record: &DeployRecord) -> BatonResult<()> {
        let sha = record.revision_sha();

        self.vcs.fetch_branch(&self.stable_branch)?;
        self.vcs.checkout(&self.stable_branch)?;
        self.vcs.reset_hard(&self.remote_ref(&self.stable_branch))?;
        let head = self.vcs.rev_parse("HEAD")?;

        tracing::info!(
            "merging {} ({}) into {}",
            sha,
            record.revision(),
            self.stable_branch
        );
        if self.vcs.merge(sha).is_err() {
            let _ = self.vcs.merge_abort();
            return Err(BatonError::MergeConflict {
                branch: self.stable_branch.clone(),
            });
        }

        // Tags ride along so the release tag lands with the merge.
        if self.vcs.push_with_tags(&self.stable_branch).is_err() {
            let _ = self.vcs.reset_hard(&head);
            return Err(BatonError::ConcurrentModification {
                branch: self.stable_branch.clone(),
            });
        }
        Ok(())
    }

    fn remote_ref(&self, branch: &str) -> String {
        format!("{}/{}", self.remote, branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::keys;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Scripted stand-in for git: a rev-parse table, a HEAD that follows
    /// checkout/reset/merge, and switches to force merge or push failures
    #[derive(Default)]
    struct FakeVcs {
        log: Mutex<Vec<String>>,
        head: Mutex<String>,
        shas: HashMap<String, String>,
        remote_branches: HashSet<String>,
        refs: Vec<String>,
        merge_base: String,
        merge_result: String,
        checkout_lands_on: Option<String>,
        fail_merge: bool,
        fail_push: bool,
    }

    impl FakeVcs {
        fn resolve(&self, rev: &str) -> String {
            if rev == "HEAD" {
                return self.head.lock().unwrap().clone();
            }
            self.shas
                .get(rev)
                .cloned()
                .unwrap_or_else(|| rev.to_string())
        }

        fn record(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn git_err(what: &str) -> BatonError {
            BatonError::Git {
                command: what.to_string(),
                message: "scripted failure".to_string(),
            }
        }
    }

    impl VersionControl for FakeVcs {
        fn fetch_branch(&self, branch: &str) -> BatonResult<()> {
            self.record(format!("fetch {}", branch));
            Ok(())
        }

        fn checkout(&self, rev: &str) -> BatonResult<()> {
            self.record(format!("checkout {}", rev));
            let landed = self
                .checkout_lands_on
                .clone()
                .unwrap_or_else(|| self.resolve(rev));
            *self.head.lock().unwrap() = landed;
            Ok(())
        }

        fn reset_hard(&self, rev: &str) -> BatonResult<()> {
            self.record(format!("reset {}", rev));
            let sha = self.resolve(rev);
            *self.head.lock().unwrap() = sha;
            Ok(())
        }

        fn merge(&self, rev: &str) -> BatonResult<()> {
            self.record(format!("merge {}", rev));
            if self.fail_merge {
                return Err(Self::git_err("merge"));
            }
            *self.head.lock().unwrap() = self.merge_result.clone();
            Ok(())
        }

        fn merge_abort(&self) -> BatonResult<()> {
            self.record("merge-abort".to_string());
            Ok(())
        }

        fn push(&self, branch: &str) -> BatonResult<()> {
            self.record(format!("push {}", branch));
            if self.fail_push {
                return Err(Self::git_err("push"));
            }
            Ok(())
        }

        fn push_with_tags(&self, branch: &str) -> BatonResult<()> {
            self.record(format!("push-with-tags {}", branch));
            if self.fail_push {
                return Err(Self::git_err("push"));
            }
            Ok(())
        }

        fn push_tags(&self) -> BatonResult<()> {
            self.record("push-tags".to_string());
            Ok(())
        }

        fn rev_parse(&self, rev: &str) -> BatonResult<String> {
            Ok(self.resolve(rev))
        }

        fn merge_base(&self, a: &str, b: &str) -> BatonResult<String> {
            self.record(format!("merge-base {} {}", a, b));
            Ok(self.merge_base.clone())
        }

        fn remote_branch_exists(&self, branch: &str) -> BatonResult<bool> {
            Ok(self.remote_branches.contains(branch))
        }

        fn show_refs(&self) -> BatonResult<Vec<String>> {
            Ok(self.refs.clone())
        }

        fn create_tag(&self, name: &str, _message: &str, commit: &str) -> BatonResult<()> {
            self.record(format!("tag {} {}", name, commit));
            Ok(())
        }

        fn tag_exists(&self, _name: &str) -> BatonResult<bool> {
            Ok(false)
        }
    }

    fn record_with_revision(revision: &str) -> DeployRecord {
        let mut record = DeployRecord::new();
        record.set(keys::REVISION, revision);
        record.set(keys::REVISION_SHA, format!("sha-{}", revision));
        record
    }

    fn branch_fixture() -> FakeVcs {
        let mut shas = HashMap::new();
        shas.insert("stable".to_string(), "sha-stable".to_string());
        shas.insert("origin/stable".to_string(), "sha-stable".to_string());
        shas.insert("feature-x".to_string(), "sha-feature".to_string());
        shas.insert("origin/feature-x".to_string(), "sha-feature".to_string());
        FakeVcs {
            shas,
            remote_branches: ["feature-x".to_string()].into_iter().collect(),
            refs: vec![
                "refs/heads/feature-x".to_string(),
                "refs/remotes/origin/feature-x".to_string(),
                "refs/remotes/origin/stable".to_string(),
            ],
            merge_result: "sha-merged".to_string(),
            ..FakeVcs::default()
        }
    }

    #[test]
    fn refuses_to_deploy_the_stable_branch() {
        let vcs = Arc::new(branch_fixture());
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");
        let err = sync
            .sync_from_stable(&record_with_revision("stable"))
            .unwrap_err();
        assert!(matches!(err, BatonError::InvalidInput(_)));
        assert!(vcs.log().is_empty());
    }

    #[test]
    fn superset_of_stable_skips_the_merge() {
        let mut fixture = branch_fixture();
        // merge-base(feature, stable) == stable: feature already has it all.
        fixture.merge_base = "sha-stable".to_string();
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        let sha = sync
            .sync_from_stable(&record_with_revision("feature-x"))
            .unwrap();

        assert_eq!(sha, "sha-feature");
        let log = vcs.log();
        assert!(!log.iter().any(|l| l.starts_with("merge ")));
        assert!(!log.iter().any(|l| l.starts_with("push")));
    }

    #[test]
    fn behind_stable_merges_and_pushes() {
        let mut fixture = branch_fixture();
        fixture.merge_base = "sha-older".to_string();
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        let sha = sync
            .sync_from_stable(&record_with_revision("feature-x"))
            .unwrap();

        assert_eq!(sha, "sha-merged");
        let log = vcs.log();
        assert_eq!(
            log,
            vec![
                "fetch stable",
                "checkout stable",
                "reset origin/stable",
                "fetch feature-x",
                "checkout feature-x",
                "reset origin/feature-x",
                "merge-base feature-x sha-stable",
                "merge stable",
                "push feature-x",
            ]
        );
    }

    #[test]
    fn checkout_landing_elsewhere_is_a_head_mismatch() {
        let mut fixture = branch_fixture();
        // A commit-ish revision: checked out directly, no reset to repair
        // a wrong landing spot afterwards.
        fixture.shas.insert("cafe12".to_string(), "sha-cafe".to_string());
        fixture.checkout_lands_on = Some("sha-surprise".to_string());
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs, "stable", "origin");

        let err = sync
            .sync_from_stable(&record_with_revision("cafe12"))
            .unwrap_err();
        assert!(matches!(
            err,
            BatonError::HeadMismatch { ref actual, .. } if actual == "sha-surprise"
        ));
    }

    #[test]
    fn bare_commit_behind_stable_is_rejected_with_known_refs() {
        let mut fixture = branch_fixture();
        fixture.merge_base = "sha-older".to_string();
        fixture.shas.insert("abc123".to_string(), "abc123".to_string());
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs, "stable", "origin");

        let err = sync
            .sync_from_stable(&record_with_revision("abc123"))
            .unwrap_err();
        match err {
            BatonError::InvalidInput(msg) => {
                assert!(msg.contains("'abc123' is not a branch"));
                assert!(msg.contains("refs/remotes/origin/feature-x"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn merge_conflict_aborts_and_reports() {
        let mut fixture = branch_fixture();
        fixture.merge_base = "sha-older".to_string();
        fixture.fail_merge = true;
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        let err = sync
            .sync_from_stable(&record_with_revision("feature-x"))
            .unwrap_err();
        assert!(matches!(err, BatonError::MergeConflict { .. }));
        assert!(vcs.log().contains(&"merge-abort".to_string()));
    }

    #[test]
    fn push_race_resets_to_premerge_commit() {
        let mut fixture = branch_fixture();
        fixture.merge_base = "sha-older".to_string();
        fixture.fail_push = true;
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        let err = sync
            .sync_from_stable(&record_with_revision("feature-x"))
            .unwrap_err();
        assert!(matches!(err, BatonError::ConcurrentModification { .. }));
        // Rolled back to the branch tip as it was before the merge.
        assert_eq!(vcs.log().last().unwrap(), "reset sha-feature");
    }

    #[test]
    fn merge_to_stable_merges_deployed_sha_and_pushes_tags() {
        let vcs = Arc::new(branch_fixture());
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        sync.merge_to_stable(&record_with_revision("feature-x"))
            .unwrap();

        assert_eq!(
            vcs.log(),
            vec![
                "fetch stable",
                "checkout stable",
                "reset origin/stable",
                "merge sha-feature-x",
                "push-with-tags stable",
            ]
        );
    }

    #[test]
    fn merge_to_stable_push_race_resets_stable() {
        let mut fixture = branch_fixture();
        fixture.fail_push = true;
        let vcs = Arc::new(fixture);
        let sync = BranchSync::new(vcs.clone(), "stable", "origin");

        let err = sync
            .merge_to_stable(&record_with_revision("feature-x"))
            .unwrap_err();
        assert!(matches!(
            err,
            BatonError::ConcurrentModification { ref branch } if branch == "stable"
        ));
        assert_eq!(vcs.log().last().unwrap(), "reset sha-stable");
    }

    #[test]
    fn tag_names() {
        assert_eq!(release_tag("250825-0901-abc123"), "deploy-250825-0901-abc123");
        assert_eq!(
            bad_version_tag("250825-0901-abc123"),
            "deploy-250825-0901-abc123-bad"
        );
    }
}
