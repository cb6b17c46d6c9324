//! Pipeline Use Case
//!
//! The dispatcher every invocation flows through:
//! 1. Load the record (or build a fresh one for `acquire-lock`)
//! 2. Check ownership (token)
//! 3. Check transition legality (legal-next-actions)
//! 4. Run the stage handler, persist the outcome
//!
//! Nothing below here terminates the process: every error is absorbed into
//! a `DispatchOutcome`, and the two ownership-protecting cases (token
//! mismatch, illegal transition) deliberately report success so a
//! non-owning caller's job runner never releases a lock it does not hold.

use std::sync::Arc;

use crate::application::alerts::Alert;
use crate::application::branch_sync::{release_tag, BranchSync};
use crate::application::links;
use crate::application::lock::LockManager;
use crate::application::props::{PropertyStore, RecordSeed};
use crate::application::rollback::RollbackController;
use crate::domain::entities::{keys, DeployRecord};
use crate::domain::ports::{Color, Notifier, PlatformQuery, Severity, VersionControl};
use crate::domain::services::transitions;
use crate::domain::value_objects::{Action, NextActions};
use crate::error::{BatonError, BatonResult};

use super::invocation::{Invocation, PipelineSettings};
use super::outcome::DispatchOutcome;

/// Stage dispatcher over the lock, record, sync and rollback machinery
pub struct Pipeline {
    props: PropertyStore,
    lock: LockManager,
    sync: BranchSync,
    rollback: RollbackController,
    vcs: Arc<dyn VersionControl>,
    platform: Arc<dyn PlatformQuery>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl Pipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        props: PropertyStore,
        lock: LockManager,
        sync: BranchSync,
        rollback: RollbackController,
        vcs: Arc<dyn VersionControl>,
        platform: Arc<dyn PlatformQuery>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            props,
            lock,
            sync,
            rollback,
            vcs,
            platform,
            notifier,
            settings,
        }
    }

    /// Validate and run one stage invocation
    pub fn dispatch(&self, invocation: &Invocation) -> DispatchOutcome {
        let mut record = if invocation.action == Action::AcquireLock {
            match self.fresh_record(invocation) {
                Ok(record) => record,
                Err(err) => {
                    tracing::error!("could not build a deploy record: {}", err);
                    return DispatchOutcome::Failed(err.to_string());
                }
            }
        } else {
            match self.props.read(&invocation.lock_dir) {
                Ok(record) => record,
                Err(err) => return self.missing_record(invocation, err),
            }
        };

        if !invocation.token.is_empty()
            && !record.token().is_empty()
            && invocation.token != record.token()
        {
            // The recorded deployer name is as untrustworthy as the token
            // here, so the alert goes out unattributed.
            Alert::new(format!(
                "ignoring {}: this invocation does not own the deploy lock \
                 (its token is {}, yours is {})",
                invocation.action,
                record.token(),
                invocation.token
            ))
            .severity(Severity::Error)
            .unattributed()
            .send(self.notifier.as_ref(), &record);
            return DispatchOutcome::IgnoredTokenMismatch;
        }

        let legal = record.next_actions();
        if !legal.allows(invocation.action) {
            let expected = legal.to_field().replace(',', " or ");
            Alert::new(format!(
                "expecting {}, but you asked for {}. Perhaps you double-clicked \
                 a link? Ignoring.",
                expected, invocation.action
            ))
            .severity(Severity::Error)
            .send(self.notifier.as_ref(), &record);
            return DispatchOutcome::IgnoredIllegalAction;
        }

        match self.run_stage(invocation, &mut record) {
            Ok(()) => {
                // The record may be gone (finish-success deletes the lock)
                // or relocated (backup-preserving release); clear the error
                // field wherever it still lives.
                if self.props.record_exists(&record.lock_dir()) {
                    if let Err(err) = self
                        .props
                        .update(&mut record, &[(keys::LAST_ERROR, String::new())])
                    {
                        tracing::warn!("could not clear the last-error field: {}", err);
                    }
                }
                DispatchOutcome::Completed
            }
            Err(err) => {
                let message = err.to_string();
                tracing::error!("{} failed: {}", invocation.action, message);
                // A failed acquire must not write a record: a record on
                // disk is lock ownership, and this caller does not have it.
                if invocation.action != Action::AcquireLock {
                    if let Err(write_err) = self
                        .props
                        .update(&mut record, &[(keys::LAST_ERROR, message.clone())])
                    {
                        tracing::warn!("could not persist the failure: {}", write_err);
                    }
                }
                DispatchOutcome::Failed(message)
            }
        }
    }

    fn run_stage(&self, invocation: &Invocation, record: &mut DeployRecord) -> BatonResult<()> {
        match invocation.action {
            Action::AcquireLock => self.stage_acquire(invocation, record),
            Action::SyncBranch => self.stage_sync(record),
            Action::ManualGate => self.stage_manual_gate(record),
            Action::SwitchLive => self.stage_switch_live(invocation, record),
            Action::FinishSuccess => self.stage_finish_success(record),
            Action::FinishFailure => self.stage_finish_failure(record),
            Action::FinishRollback => self.stage_finish_rollback(record),
            Action::ForceUnlock => self.stage_force_unlock(invocation, record),
            Action::Relock => self.stage_relock(record),
        }
    }

    fn stage_acquire(&self, invocation: &Invocation, record: &mut DeployRecord) -> BatonResult<()> {
        self.lock.acquire(record, invocation.build_url.as_deref())?;
        // The lock is ours; now the record may exist on disk.
        self.props.write(record)?;
        self.advance(record, Action::AcquireLock)
    }

    fn stage_sync(&self, record: &mut DeployRecord) -> BatonResult<()> {
        let sha = self.sync.sync_from_stable(record)?;
        // One update carries the resolved commit and the successor set; the
        // deploy version re-derives from the new commit on the way through.
        let mut changes: Vec<(&str, String)> = vec![(keys::REVISION_SHA, sha)];
        if let Some(next) = transitions::successors(Action::SyncBranch, record.auto_deploy()) {
            changes.push((keys::NEXT_ACTIONS, next.to_field()));
        }
        self.props.update(record, &changes)
    }

    fn stage_manual_gate(&self, record: &mut DeployRecord) -> BatonResult<()> {
        let preview = self.settings.preview_url_for(record.version());
        let staged = if preview.is_empty() {
            format!("{} (revision {}) is staged", record.version(), record.revision())
        } else {
            format!(
                "{} (revision {}) is staged at {}",
                record.version(),
                record.revision(),
                preview
            )
        };
        Alert::new(format!(
            "{} - try it out! When everything looks good, switch it live via {}; \
             to abort the deploy instead, use {}",
            staged,
            links::action_link(
                record,
                Action::SwitchLive,
                &[("auto-deploy", record.get(keys::AUTO_DEPLOY))],
            ),
            links::cancel_link(record)
        ))
        .color(Color::Green)
        .rich()
        .send(self.notifier.as_ref(), record);

        self.advance(record, Action::ManualGate)
    }

    fn stage_switch_live(
        &self,
        invocation: &Invocation,
        record: &mut DeployRecord,
    ) -> BatonResult<()> {
        self.rollback.run_monitoring_window(
            record,
            invocation.monitor_minutes,
            invocation.build_url.as_deref(),
        )?;
        if record.auto_deploy() {
            // Nobody is around to click finish-success; chain straight into it.
            self.stage_finish_success(record)
        } else {
            self.advance(record, Action::SwitchLive)
        }
    }

    fn stage_finish_success(&self, record: &mut DeployRecord) -> BatonResult<()> {
        // Tag only if this deploy actually went live; a run that skipped
        // the traffic switch has nothing to tag.
        if self.platform.current_live_version()? == record.version() {
            let tag = release_tag(record.version());
            if !self.vcs.tag_exists(&tag)? {
                self.vcs.create_tag(
                    &tag,
                    &format!("deployed from {}", record.revision()),
                    record.revision_sha(),
                )?;
            }
        }

        if let Err(err) = self.sync.merge_to_stable(record) {
            Alert::new(format!(
                "deploy of {} (revision {}) succeeded, but merging it back into \
                 stable failed: {}. Merge and push by hand, then release the \
                 lock via {}",
                record.version(),
                record.revision(),
                err,
                links::action_link(record, Action::ForceUnlock, &[])
            ))
            .severity(Severity::Error)
            .color(Color::Red)
            .rich()
            .send(self.notifier.as_ref(), record);
            return Err(err);
        }

        Alert::new(format!(
            "deploy of {} (revision {}) succeeded!",
            record.version(),
            record.revision()
        ))
        .color(Color::Green)
        .send(self.notifier.as_ref(), record);

        self.lock.release(record, false)
    }

    fn stage_finish_failure(&self, record: &mut DeployRecord) -> BatonResult<()> {
        let why = if record.last_error().is_empty() {
            ".".to_string()
        } else {
            format!(": {}", record.last_error())
        };
        Alert::new(format!(
            "deploy of {} (revision {}) failed{}",
            record.version(),
            record.revision(),
            why
        ))
        .severity(Severity::Error)
        .color(Color::Red)
        .send(self.notifier.as_ref(), record);

        self.lock.release(record, true)
    }

    fn stage_finish_rollback(&self, record: &mut DeployRecord) -> BatonResult<()> {
        if !record.last_error().is_empty() {
            Alert::new(format!(
                "rolling back {} because the deploy hit trouble: {}",
                record.version(),
                record.last_error()
            ))
            .severity(Severity::Error)
            .color(Color::Red)
            .send(self.notifier.as_ref(), record);
        }

        if !self.rollback.rollback(record) {
            Alert::new(format!(
                "once you have rolled back by hand, release the deploy lock via {}",
                links::action_link(record, Action::ForceUnlock, &[])
            ))
            .severity(Severity::Error)
            .rich()
            .send(self.notifier.as_ref(), record);
            return Err(BatonError::RollbackFailed {
                version: record.version().to_string(),
            });
        }

        self.stage_finish_failure(record)
    }

    fn stage_force_unlock(
        &self,
        invocation: &Invocation,
        record: &mut DeployRecord,
    ) -> BatonResult<()> {
        let caller = transitions::display_name(&invocation.caller);
        if caller == record.deployer_name() {
            Alert::new("manually released the deploy lock").send(self.notifier.as_ref(), record);
        } else {
            Alert::new(format!("{} manually released the deploy lock", caller))
                .send(self.notifier.as_ref(), record);
        }
        self.lock.release(record, true)
    }

    fn stage_relock(&self, record: &mut DeployRecord) -> BatonResult<()> {
        self.lock.relock(record)?;
        // The relocked pipeline is in an unknown position and a human is
        // driving; every stage becomes legal.
        self.props
            .update(record, &[(keys::NEXT_ACTIONS, NextActions::any().to_field())])
    }

    /// Set legal-next-actions to the stage's successor set, if it has one
    fn advance(&self, record: &mut DeployRecord, stage: Action) -> BatonResult<()> {
        match transitions::successors(stage, record.auto_deploy()) {
            Some(next) => self
                .props
                .update(record, &[(keys::NEXT_ACTIONS, next.to_field())]),
            None => Ok(()),
        }
    }

    fn fresh_record(&self, invocation: &Invocation) -> BatonResult<DeployRecord> {
        self.props.create(RecordSeed {
            lock_dir: invocation.lock_dir.clone(),
            deployer_id: invocation.deployer.clone(),
            revision: invocation.revision.clone(),
            auto_deploy: invocation.auto_deploy,
            rollback_to: invocation.rollback_to.clone(),
            token: invocation.token.clone(),
            runner_url: self.settings.runner_url.clone(),
            chat_room: self.settings.chat_room.clone(),
            chat_sender: self.settings.chat_sender.clone(),
            deploy_user: self.settings.deploy_user.clone(),
            credential_file: self.settings.credential_file.clone(),
        })
    }

    fn missing_record(&self, invocation: &Invocation, err: BatonError) -> DispatchOutcome {
        if invocation.action == Action::Relock {
            let message = format!(
                "there is no backup lock at {} to recover: {}",
                invocation.lock_dir.display(),
                err
            );
            tracing::error!("{}", message);
            return DispatchOutcome::Failed(message);
        }

        // Best effort with only caller-supplied identity; there is no lock
        // to release, so this must not look like a failure a runner would
        // react to by releasing one.
        tracing::error!(
            "no deploy record at {}: {}",
            invocation.lock_dir.display(),
            err
        );
        let stand_in = self.stand_in_record(invocation);
        Alert::new(format!(
            "tried to run {} without the deploy lock. If you think you should \
             hold it, re-acquire it via {} and run your command again.",
            invocation.action,
            links::action_link(&stand_in, Action::Relock, &[])
        ))
        .severity(Severity::Error)
        .rich()
        .send(self.notifier.as_ref(), &stand_in);
        DispatchOutcome::NoRecord
    }

    /// Minimal record for alerting when the real one cannot be loaded
    fn stand_in_record(&self, invocation: &Invocation) -> DeployRecord {
        let mut record = DeployRecord::new();
        record.set_lock_dir(&invocation.lock_dir);
        record.set(keys::CHAT_ROOM, self.settings.chat_room.clone());
        record.set(keys::CHAT_SENDER, self.settings.chat_sender.clone());
        record.set(keys::RUNNER_URL, self.settings.runner_url.clone());
        if !invocation.caller.is_empty() {
            record.set(
                keys::DEPLOYER_MENTION,
                transitions::fallback_mention(transitions::display_name(&invocation.caller)),
            );
        }
        record
    }
}
