//! DeployRecord entity - the shared state of one in-flight deploy
//!
//! A flat string-to-string map, persisted as one `key=value` file inside the
//! lock directory. Every pipeline stage reads it, extends it, and writes it
//! back; its existence on disk is equivalent to holding the deploy lock.
//!
//! The record deliberately stays a string map rather than a typed struct:
//! job-runner scripts grep the file, operators hand-edit it during
//! recoveries, and unknown keys must survive a read/write cycle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::domain::value_objects::NextActions;

/// Record field names
///
/// Uppercase on disk: the file doubles as documentation for whoever is
/// staring at a stuck deploy at 2am.
pub mod keys {
    pub const AUTO_DEPLOY: &str = "AUTO_DEPLOY";
    pub const CHAT_ROOM: &str = "CHAT_ROOM";
    pub const CHAT_SENDER: &str = "CHAT_SENDER";
    pub const CREDENTIAL_FILE: &str = "CREDENTIAL_FILE";
    pub const DEPLOYER_ID: &str = "DEPLOYER_ID";
    pub const DEPLOYER_MENTION: &str = "DEPLOYER_MENTION";
    pub const DEPLOYER_NAME: &str = "DEPLOYER_NAME";
    pub const DEPLOY_USER: &str = "DEPLOY_USER";
    pub const LAST_ERROR: &str = "LAST_ERROR";
    pub const LOCK_ACQUIRED_AT: &str = "LOCK_ACQUIRED_AT";
    pub const LOCK_DIR: &str = "LOCK_DIR";
    pub const NEXT_ACTIONS: &str = "NEXT_ACTIONS";
    pub const REVISION: &str = "REVISION";
    pub const REVISION_SHA: &str = "REVISION_SHA";
    pub const ROLLBACK_TO: &str = "ROLLBACK_TO";
    pub const RUNNER_URL: &str = "RUNNER_URL";
    pub const TOKEN: &str = "TOKEN";
    pub const VERSION: &str = "VERSION";
}

/// One deploy's persisted state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeployRecord {
    fields: BTreeMap<String, String>,
}

impl DeployRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-parsed fields (the store's read path)
    pub fn from_fields(fields: BTreeMap<String, String>) -> Self {
        Self { fields }
    }

    /// All fields, sorted by key
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Raw field lookup; absent keys read as empty
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    /// Whether the key is present at all (even if empty)
    pub fn has(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    // Typed accessors over the well-known keys.

    pub fn lock_dir(&self) -> PathBuf {
        PathBuf::from(self.get(keys::LOCK_DIR))
    }

    pub fn set_lock_dir(&mut self, dir: &Path) {
        self.set(keys::LOCK_DIR, dir.to_string_lossy().into_owned());
    }

    pub fn deployer_id(&self) -> &str {
        self.get(keys::DEPLOYER_ID)
    }

    pub fn deployer_name(&self) -> &str {
        self.get(keys::DEPLOYER_NAME)
    }

    pub fn deployer_mention(&self) -> &str {
        self.get(keys::DEPLOYER_MENTION)
    }

    pub fn revision(&self) -> &str {
        self.get(keys::REVISION)
    }

    pub fn revision_sha(&self) -> &str {
        self.get(keys::REVISION_SHA)
    }

    pub fn version(&self) -> &str {
        self.get(keys::VERSION)
    }

    pub fn rollback_to(&self) -> &str {
        self.get(keys::ROLLBACK_TO)
    }

    pub fn token(&self) -> &str {
        self.get(keys::TOKEN)
    }

    pub fn last_error(&self) -> &str {
        self.get(keys::LAST_ERROR)
    }

    pub fn runner_url(&self) -> &str {
        self.get(keys::RUNNER_URL)
    }

    pub fn chat_room(&self) -> &str {
        self.get(keys::CHAT_ROOM)
    }

    pub fn chat_sender(&self) -> &str {
        self.get(keys::CHAT_SENDER)
    }

    pub fn deploy_user(&self) -> &str {
        self.get(keys::DEPLOY_USER)
    }

    pub fn credential_file(&self) -> PathBuf {
        PathBuf::from(self.get(keys::CREDENTIAL_FILE))
    }

    /// `AUTO_DEPLOY` is stored as `"true"` / `"false"`
    pub fn auto_deploy(&self) -> bool {
        self.get(keys::AUTO_DEPLOY).eq_ignore_ascii_case("true")
    }

    /// Parsed legal-next-actions set
    pub fn next_actions(&self) -> NextActions {
        NextActions::from_field(self.get(keys::NEXT_ACTIONS))
    }

    /// When the lock directory was created, if stamped and parseable
    pub fn lock_acquired_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.get(keys::LOCK_ACQUIRED_AT))
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}
