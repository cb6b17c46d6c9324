//! PropertyStore - lifecycle of the deploy record
//!
//! One entry point (`update`) owns every derived field. Stages never poke
//! derived keys directly: they change a root field and the ordered rule
//! table keeps the dependent, human-readable fields consistent on disk.
//!
//! Rule order matters and is fixed:
//! 1. resolved revision        -> deploy version        (VersionNamer)
//! 2. deployer identity        -> display name          (local part)
//! 3. display name             -> chat mention          (DirectoryLookup)
//! 4. lock directory path      -> acquisition timestamp (Clock)
//! 5. legal next actions       -> union escape hatches, sorted
//!
//! Derived values join the change set, so one root change cascades (a new
//! deployer identity re-derives both the display name and the mention).
//! A caller that explicitly sets a derived key wins over its rule.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::domain::entities::{keys, DeployRecord};
use crate::domain::ports::{Clock, DirectoryLookup, RecordStore, VersionNamer};
use crate::domain::services::transitions;
use crate::domain::value_objects::{Action, NextActions};
use crate::error::BatonResult;

/// Inputs for a fresh record, straight from the invocation and config
#[derive(Debug, Clone, Default)]
pub struct RecordSeed {
    pub lock_dir: PathBuf,
    pub deployer_id: String,
    pub revision: String,
    pub auto_deploy: bool,
    pub rollback_to: String,
    pub token: String,
    pub runner_url: String,
    pub chat_room: String,
    pub chat_sender: String,
    pub deploy_user: String,
    pub credential_file: PathBuf,
}

/// Record lifecycle over the persistence and naming ports
#[derive(Clone)]
pub struct PropertyStore {
    store: Arc<dyn RecordStore>,
    namer: Arc<dyn VersionNamer>,
    directory: Arc<dyn DirectoryLookup>,
    clock: Arc<dyn Clock>,
}

impl PropertyStore {
    pub fn new(
        store: Arc<dyn RecordStore>,
        namer: Arc<dyn VersionNamer>,
        directory: Arc<dyn DirectoryLookup>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            namer,
            directory,
            clock,
        }
    }

    /// Build a fresh record; no filesystem contact
    ///
    /// The lock does not exist yet at this point, so nothing may be written:
    /// a record on disk is indistinguishable from a held lock.
    pub fn create(&self, seed: RecordSeed) -> BatonResult<DeployRecord> {
        let mut record = DeployRecord::new();
        record.set_lock_dir(&seed.lock_dir);
        record.set(keys::DEPLOYER_ID, seed.deployer_id.clone());
        record.set(keys::REVISION, seed.revision.clone());
        // The revision starts unresolved; sync-branch re-resolves it once
        // the remote has been fetched.
        record.set(keys::REVISION_SHA, seed.revision.clone());
        record.set(keys::VERSION, self.namer.version_for(&seed.revision)?);

        let name = transitions::display_name(&seed.deployer_id).to_string();
        record.set(
            keys::DEPLOYER_MENTION,
            self.mention_for(&seed.deployer_id, &name),
        );
        record.set(keys::DEPLOYER_NAME, name);

        record.set(
            keys::AUTO_DEPLOY,
            if seed.auto_deploy { "true" } else { "false" },
        );
        record.set(keys::ROLLBACK_TO, seed.rollback_to);
        record.set(keys::TOKEN, seed.token);
        record.set(keys::RUNNER_URL, seed.runner_url);
        record.set(keys::CHAT_ROOM, seed.chat_room);
        record.set(keys::CHAT_SENDER, seed.chat_sender);
        record.set(keys::DEPLOY_USER, seed.deploy_user);
        record.set(
            keys::CREDENTIAL_FILE,
            seed.credential_file.to_string_lossy().into_owned(),
        );
        record.set(keys::LAST_ERROR, "");

        let next = NextActions::only(&[Action::AcquireLock]).with_escape_hatches();
        record.set(keys::NEXT_ACTIONS, next.to_field());
        Ok(record)
    }

    pub fn read(&self, dir: &Path) -> BatonResult<DeployRecord> {
        self.store.load(dir)
    }

    pub fn write(&self, record: &DeployRecord) -> BatonResult<()> {
        self.store.save(record)
    }

    pub fn record_exists(&self, dir: &Path) -> bool {
        self.store.exists(dir)
    }

    /// Apply `changes`, fire the derivation rules, persist
    pub fn update(&self, record: &mut DeployRecord, changes: &[(&str, String)]) -> BatonResult<()> {
        let mut merged: BTreeMap<String, String> = changes
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();

        if merged.contains_key(keys::REVISION_SHA) && !merged.contains_key(keys::VERSION) {
            let version = self.namer.version_for(&merged[keys::REVISION_SHA])?;
            merged.insert(keys::VERSION.to_string(), version);
        }

        if merged.contains_key(keys::DEPLOYER_ID) && !merged.contains_key(keys::DEPLOYER_NAME) {
            let name = transitions::display_name(&merged[keys::DEPLOYER_ID]).to_string();
            merged.insert(keys::DEPLOYER_NAME.to_string(), name);
        }

        if merged.contains_key(keys::DEPLOYER_NAME) && !merged.contains_key(keys::DEPLOYER_MENTION)
        {
            let identity = merged
                .get(keys::DEPLOYER_ID)
                .cloned()
                .unwrap_or_else(|| record.deployer_id().to_string());
            let mention = self.mention_for(&identity, &merged[keys::DEPLOYER_NAME]);
            merged.insert(keys::DEPLOYER_MENTION.to_string(), mention);
        }

        if merged.contains_key(keys::LOCK_DIR) && !merged.contains_key(keys::LOCK_ACQUIRED_AT) {
            merged.insert(
                keys::LOCK_ACQUIRED_AT.to_string(),
                self.clock.now().to_rfc3339(),
            );
        }

        if let Some(field) = merged.get(keys::NEXT_ACTIONS) {
            let next = NextActions::from_field(field).with_escape_hatches();
            merged.insert(keys::NEXT_ACTIONS.to_string(), next.to_field());
        }

        for (key, value) in merged {
            record.set(key, value);
        }
        self.write(record)
    }

    fn mention_for(&self, identity: &str, display_name: &str) -> String {
        match self.directory.mention_for(identity) {
            Ok(Some(mention)) => mention,
            Ok(None) => transitions::fallback_mention(display_name),
            Err(err) => {
                tracing::debug!("directory lookup failed for {}: {}", identity, err);
                transitions::fallback_mention(display_name)
            }
        }
    }
}
