//! RollbackController - the live traffic switch and its safety net
//!
//! `run_monitoring_window` owns the one irreversible moment of a deploy:
//! baseline, prime, switch, then watch the monitoring for a bounded window.
//! What happens on trouble depends on who is driving. An auto deploy gets
//! its errors re-raised so the job runner triggers `finish-rollback`; a
//! human-driven deploy gets a notification with finish/rollback links and
//! keeps the pipeline pending, because a human gets to look first.
//!
//! `rollback` never raises. It is the terminal best-effort action: the
//! caller needs a yes/no to decide what to tell the human, not a stack of
//! errors on top of an already-failed deploy.

use std::sync::Arc;

use crate::application::alerts::Alert;
use crate::application::branch_sync::bad_version_tag;
use crate::application::links;
use crate::domain::entities::DeployRecord;
use crate::domain::ports::{
    Color, CredentialRef, DeployExecutor, Notifier, PlatformQuery, Severity, VersionControl,
    WatchVerdict,
};
use crate::domain::value_objects::Action;
use crate::error::{BatonError, BatonResult};

pub struct RollbackController {
    executor: Arc<dyn DeployExecutor>,
    platform: Arc<dyn PlatformQuery>,
    vcs: Arc<dyn VersionControl>,
    notifier: Arc<dyn Notifier>,
    prime_instances: u32,
}

impl RollbackController {
    pub fn new(
        executor: Arc<dyn DeployExecutor>,
        platform: Arc<dyn PlatformQuery>,
        vcs: Arc<dyn VersionControl>,
        notifier: Arc<dyn Notifier>,
        prime_instances: u32,
    ) -> Self {
        Self {
            executor,
            platform,
            vcs,
            notifier,
            prime_instances,
        }
    }

    /// Switch live traffic to this deploy and watch it for `minutes`
    ///
    /// Errors only escape when auto-deploy is on; with a human driving,
    /// trouble is reported with next-step links and `Ok` is returned so
    /// the deploy stays pending instead of being torn down.
    pub fn run_monitoring_window(
        &self,
        record: &DeployRecord,
        minutes: u32,
        build_url: Option<&str>,
    ) -> BatonResult<()> {
        tracing::info!(
            "switching live traffic from {} to {}",
            record.rollback_to(),
            record.version()
        );
        let auto = record.auto_deploy();
        let mut primed = false;

        match self.switch_and_watch(record, minutes, build_url, &mut primed) {
            Ok(()) => {
                if !auto {
                    self.announce_healthy(record, minutes);
                }
                Ok(())
            }
            Err(BatonError::MonitoringFailed(why)) => {
                if auto {
                    Alert::new(format!("monitoring flagged {}: {}", record.version(), why))
                        .severity(Severity::Warning)
                        .color(Color::Yellow)
                        .send(self.notifier.as_ref(), record);
                    // Re-raising makes the job runner kick off finish-rollback.
                    Err(BatonError::MonitoringFailed(why))
                } else {
                    Alert::new(format!(
                        "monitoring flagged {}: {}. Check whether the site is ok, then \
                         finish via {} or roll back via {}",
                        record.version(),
                        why,
                        links::action_link(record, Action::FinishSuccess, &[]),
                        self.rollback_link(record)
                    ))
                    .severity(Severity::Warning)
                    .color(Color::Yellow)
                    .rich()
                    .send(self.notifier.as_ref(), record);
                    Ok(())
                }
            }
            Err(err) => {
                if auto {
                    Alert::new(format!("the live traffic switch failed: {}", err))
                        .severity(Severity::Critical)
                        .color(Color::Red)
                        .send(self.notifier.as_ref(), record);
                    Err(err)
                } else {
                    let priming_note = if primed {
                        " (instances are already primed; skip priming)"
                    } else {
                        ""
                    };
                    Alert::new(format!(
                        "the live traffic switch failed: {}. Either switch traffic to {} \
                         by hand{} and finish via {}, or roll back via {}",
                        err,
                        record.version(),
                        priming_note,
                        links::action_link(record, Action::FinishSuccess, &[]),
                        self.rollback_link(record)
                    ))
                    .severity(Severity::Critical)
                    .color(Color::Red)
                    .rich()
                    .send(self.notifier.as_ref(), record);
                    Ok(())
                }
            }
        }
    }

    /// Put the previous version back in front of live traffic
    ///
    /// No-op (and success) when this deploy's version is not actually live;
    /// rollback also gets invoked on deploys that died before the switch.
    /// Returns whether the rollback completed.
    pub fn rollback(&self, record: &DeployRecord) -> bool {
        match self.try_rollback(record) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!("rollback of {} failed: {}", record.version(), err);
                Alert::new(format!(
                    "automatic rollback failed ({})! Switch live traffic back to {} by hand.",
                    err,
                    record.rollback_to()
                ))
                .severity(Severity::Critical)
                .color(Color::Red)
                .send(self.notifier.as_ref(), record);
                false
            }
        }
    }

    fn switch_and_watch(
        &self,
        record: &DeployRecord,
        minutes: u32,
        build_url: Option<&str>,
        primed: &mut bool,
    ) -> BatonResult<()> {
        let version = record.version();
        let baseline = self.executor.monitoring_baseline(minutes)?;

        self.executor.prime_instances(version, self.prime_instances)?;
        *primed = true;

        let credentials = CredentialRef {
            user: record.deploy_user().to_string(),
            secret_file: record.credential_file(),
        };
        self.executor.switch_live(version, &credentials)?;

        if minutes > 0 {
            if !record.auto_deploy() {
                if let Some(url) = build_url {
                    Alert::new(format!(
                        "{} is taking live traffic; watching monitoring for the next {} \
                         minutes. If you spot a problem before I do, abort via {}",
                        version,
                        minutes,
                        links::stop_build_link(url)
                    ))
                    .rich()
                    .send(self.notifier.as_ref(), record);
                }
            }
            match self
                .executor
                .watch_for_regressions(version, minutes, &baseline)?
            {
                WatchVerdict::Healthy => {}
                WatchVerdict::RegressionDetected(why) => {
                    return Err(BatonError::MonitoringFailed(why))
                }
            }
        }
        Ok(())
    }

    fn try_rollback(&self, record: &DeployRecord) -> BatonResult<()> {
        let version = record.version();
        let live = self.platform.current_live_version()?;
        if live != version {
            tracing::info!(
                "skipping rollback: {} never went live (live is {}, rollback target {})",
                version,
                live,
                record.rollback_to()
            );
            return Ok(());
        }

        Alert::new(format!(
            "rolling live traffic back to {} and tagging {} as bad",
            record.rollback_to(),
            version
        ))
        .send(self.notifier.as_ref(), record);

        let bad_tag = bad_version_tag(version);
        if !self.vcs.tag_exists(&bad_tag)? {
            self.vcs.create_tag(
                &bad_tag,
                &format!("bad version {}: rolled back", version),
                record.revision_sha(),
            )?;
        }
        self.vcs.push_tags()?;

        let credentials = CredentialRef {
            user: record.deploy_user().to_string(),
            secret_file: record.credential_file(),
        };
        self.executor
            .switch_live(record.rollback_to(), &credentials)?;

        if self.vcs.tag_exists(&bad_version_tag(record.rollback_to()))? {
            Alert::new(format!(
                "rolled back to {}, but that version has itself been marked bad. \
                 Recovery may need to go further back; check the version tags.",
                record.rollback_to()
            ))
            .severity(Severity::Warning)
            .color(Color::Yellow)
            .send(self.notifier.as_ref(), record);
        }
        Ok(())
    }

    fn announce_healthy(&self, record: &DeployRecord, minutes: u32) {
        let lead = if minutes > 0 {
            format!("monitoring passed for the new live version ({})!", record.version())
        } else {
            format!("{} is now taking live traffic!", record.version())
        };
        Alert::new(format!(
            "{} Double-check that everything looks right, then finish via {} or \
             roll back via {}",
            lead,
            links::action_link(record, Action::FinishSuccess, &[]),
            self.rollback_link(record)
        ))
        .color(Color::Green)
        .rich()
        .send(self.notifier.as_ref(), record);
    }

    fn rollback_link(&self, record: &DeployRecord) -> String {
        links::action_link(
            record,
            Action::FinishRollback,
            &[("rollback-to", record.rollback_to())],
        )
    }
}
