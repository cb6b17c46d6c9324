//! LockManager - directory-existence mutual exclusion
//!
//! Directory creation is the only atomic primitive relied on: whoever
//! creates the lock directory owns the deploy. Release either deletes the
//! directory or renames it to a `.prev` backup that `relock` can restore,
//! so a cancelled pipeline can be resumed under manual control.
//!
//! Acquisition busy-waits in fixed 10-second polls. The wait clock counts
//! from the *holder's* recorded acquisition time, not from when this caller
//! started waiting: a lock that has been held for an hour is stuck no
//! matter who is asking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::application::alerts::Alert;
use crate::application::links;
use crate::application::props::PropertyStore;
use crate::domain::entities::{keys, DeployRecord};
use crate::domain::ports::{Clock, Color, Notifier, Severity};
use crate::domain::services::transitions::{self, RecoverySuggestion};
use crate::domain::value_objects::Action;
use crate::error::{BatonError, BatonResult};

/// Suffix a released-but-kept lock directory is renamed to
pub const BACKUP_SUFFIX: &str = ".prev";

/// Fixed poll increment of the acquisition busy-wait
const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long to wait for a held lock, and how often to nag about it
#[derive(Debug, Clone)]
pub struct LockSettings {
    pub wait: Duration,
    pub notify_every: Duration,
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            wait: Duration::from_secs(3600),
            notify_every: Duration::from_secs(600),
        }
    }
}

pub struct LockManager {
    props: PropertyStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: LockSettings,
}

impl LockManager {
    pub fn new(
        props: PropertyStore,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: LockSettings,
    ) -> Self {
        Self {
            props,
            notifier,
            clock,
            settings,
        }
    }

    /// Take the lock directory, waiting behind a current holder if needed
    ///
    /// On success the acquisition time is stamped into `record` but nothing
    /// is written to disk; the caller persists the record once it decides
    /// the stage as a whole succeeded.
    pub fn acquire(&self, record: &mut DeployRecord, build_url: Option<&str>) -> BatonResult<()> {
        let dir = record.lock_dir();
        if self.try_create(&dir)? {
            self.announce_acquired(record, build_url, false);
            return Ok(());
        }

        // Someone holds it. Their record tells us who and for how long;
        // tolerate an unreadable record as "unknown holder, just now".
        let mut elapsed = self
            .holder_snapshot(&dir)
            .and_then(|h| h.lock_acquired_at())
            .map(|t| (self.clock.now() - t).num_seconds().max(0) as u64)
            .unwrap_or(0);
        let wait = self.settings.wait.as_secs();
        let notify_every = self.settings.notify_every.as_secs().max(1);

        if elapsed < wait {
            self.announce_queued(record, &dir, elapsed, true);
        }
        // Explicit next-notification threshold: one nag per crossed
        // notify_every boundary of total wait, whatever the poll size.
        let mut next_notify = elapsed + notify_every;

        while elapsed < wait {
            self.clock.sleep(POLL_INTERVAL);
            elapsed += POLL_INTERVAL.as_secs();

            if self.try_create(&dir)? {
                self.announce_acquired(record, build_url, true);
                return Ok(());
            }

            if elapsed >= next_notify {
                self.announce_queued(record, &dir, elapsed, false);
                while next_notify <= elapsed {
                    next_notify += notify_every;
                }
            }
        }

        self.announce_stuck(record, &dir, elapsed);
        Err(BatonError::LockTimeout {
            dir,
            waited_secs: elapsed,
        })
    }

    /// Drop the lock, keeping a `.prev` backup unless told otherwise
    pub fn release(&self, record: &mut DeployRecord, keep_backup: bool) -> BatonResult<()> {
        let primary = record.lock_dir();
        let result = if keep_backup {
            self.release_with_backup(record, &primary)
        } else {
            fs::remove_dir_all(&primary).map_err(BatonError::from)
        };

        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                // A half-released lock is worse than a held one: nobody can
                // tell whether it is owned. Never swallow this.
                Alert::new(format!(
                    "could not release the deploy lock at {}: {}. The lock may still be \
                     held; it needs cleaning up by hand.",
                    primary.display(),
                    err
                ))
                .severity(Severity::Error)
                .color(Color::Red)
                .send(self.notifier.as_ref(), record);

                Err(match err {
                    BatonError::Io(source) => BatonError::LockReleaseFailed {
                        dir: primary,
                        source,
                    },
                    other => other,
                })
            }
        }
    }

    /// Restore a backup lock directory to primary
    ///
    /// Inverse of a backup-preserving `release`, provided nobody acquired
    /// the primary path in between.
    pub fn relock(&self, record: &mut DeployRecord) -> BatonResult<()> {
        let current = record.lock_dir();
        let current_str = current.to_string_lossy().into_owned();
        let primary_str = match current_str.strip_suffix(BACKUP_SUFFIX) {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => {
                return Err(BatonError::InvalidState(format!(
                    "cannot relock {}: expected a backup path ending in '{}'",
                    current.display(),
                    BACKUP_SUFFIX
                )))
            }
        };

        let primary = PathBuf::from(&primary_str);
        if primary.exists() {
            return Err(BatonError::AlreadyLocked { dir: primary });
        }

        fs::rename(&current, &primary)?;
        self.props
            .update(record, &[(keys::LOCK_DIR, primary_str)])
    }

    fn release_with_backup(&self, record: &mut DeployRecord, primary: &Path) -> BatonResult<()> {
        let backup = backup_path(primary);
        match fs::remove_dir_all(&backup) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        fs::rename(primary, &backup)?;
        // Pushing the move through update restamps the acquisition time and
        // writes the record into its new home.
        self.props
            .update(record, &[(keys::LOCK_DIR, backup.to_string_lossy().into_owned())])
    }

    /// Create-only directory creation; "already exists" is the one loss
    fn try_create(&self, dir: &Path) -> BatonResult<bool> {
        if let Some(parent) = dir.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match fs::create_dir(dir) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn holder_snapshot(&self, dir: &Path) -> Option<DeployRecord> {
        self.props.read(dir).ok()
    }

    fn announce_acquired(&self, record: &mut DeployRecord, build_url: Option<&str>, waited: bool) {
        record.set(keys::LOCK_ACQUIRED_AT, self.clock.now().to_rfc3339());

        let mut text = if waited {
            format!(
                "thanks for waiting! Deploy of {} (revision {}) is starting",
                record.version(),
                record.revision()
            )
        } else {
            format!(
                "deploy of {} (revision {}) is starting",
                record.version(),
                record.revision()
            )
        };
        let mut rich = false;
        if !record.auto_deploy() {
            if let Some(url) = build_url {
                text.push_str(&format!(
                    " - to cancel it, visit {}",
                    links::stop_build_link(url)
                ));
                rich = true;
            }
        }

        let alert = Alert::new(text).color(Color::Green);
        let alert = if rich { alert.rich() } else { alert };
        alert.send(self.notifier.as_ref(), record);
    }

    fn announce_queued(&self, record: &DeployRecord, dir: &Path, elapsed: u64, first: bool) {
        // Fresh snapshot every time: the holder's position (and therefore
        // the right recovery suggestion) moves while we sleep.
        let holder = self.holder_snapshot(dir);
        let who = holder
            .as_ref()
            .map(|h| h.deployer_mention().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "someone".to_string());

        let text = if first {
            format!(
                "waiting for the deploy lock at {}: {} has held it for {}. {}",
                dir.display(),
                who,
                human_duration(elapsed),
                self.suggestion_text(holder.as_ref(), dir)
            )
        } else {
            format!(
                "still waiting for the deploy lock ({} of total wait). {}",
                human_duration(elapsed),
                self.suggestion_text(holder.as_ref(), dir)
            )
        };

        Alert::new(text)
            .severity(Severity::Warning)
            .color(Color::Yellow)
            .rich()
            .send(self.notifier.as_ref(), record);
    }

    fn announce_stuck(&self, record: &DeployRecord, dir: &Path, elapsed: u64) {
        let holder = self.holder_snapshot(dir);
        Alert::new(format!(
            "giving up: the deploy lock at {} has been held for {} and nothing moved. {}",
            dir.display(),
            human_duration(elapsed),
            self.suggestion_text(holder.as_ref(), dir)
        ))
        .severity(Severity::Error)
        .color(Color::Red)
        .rich()
        .send(self.notifier.as_ref(), record);
    }

    /// Targeted recovery text, built from the holder's own record so the
    /// links carry the holder's token
    fn suggestion_text(&self, holder: Option<&DeployRecord>, dir: &Path) -> String {
        let holder = match holder {
            Some(h) => h,
            None => {
                return format!(
                    "Its record is unreadable; if it is abandoned, run \
                     `baton force-unlock --lock-dir {}` with your identity.",
                    dir.display()
                )
            }
        };

        match transitions::recovery_suggestion(&holder.next_actions()) {
            RecoverySuggestion::CancelDeploy => format!(
                "Their deploy has not switched traffic yet; cancel it via {}",
                links::cancel_link(holder)
            ),
            RecoverySuggestion::FinishDeploy => format!(
                "Their deploy looks live but unfinished; finish it via {} or roll it back via {}",
                links::action_link(holder, Action::FinishSuccess, &[]),
                links::action_link(holder, Action::FinishRollback, &[])
            ),
            RecoverySuggestion::ForceUnlock => format!(
                "The lock looks wedged; force it open via {}",
                links::action_link(holder, Action::ForceUnlock, &[])
            ),
        }
    }
}

/// Backup path for a primary lock directory
pub fn backup_path(primary: &Path) -> PathBuf {
    let mut os = primary.as_os_str().to_os_string();
    os.push(BACKUP_SUFFIX);
    PathBuf::from(os)
}

fn human_duration(secs: u64) -> String {
    if secs < 60 {
        return format!("{}s", secs);
    }
    let mins = secs / 60;
    let rem = secs % 60;
    if rem == 0 {
        format!("{}m", mins)
    } else {
        format!("{}m{}s", mins, rem)
    }
}
