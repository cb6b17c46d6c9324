//! Configuration type definitions

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::BatonResult;

use super::loader::{self, ConfigWarning};

/// Deploy-lock location and wait behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockConfig {
    /// Directory whose existence IS the lock.
    #[serde(default = "default_lock_dir")]
    pub dir: PathBuf,

    /// How long `acquire-lock` waits for the holder before giving up.
    #[serde(default = "default_wait_secs")]
    pub wait_secs: u64,

    /// How often to re-announce while waiting.
    #[serde(default = "default_notify_secs")]
    pub notify_secs: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            dir: default_lock_dir(),
            wait_secs: default_wait_secs(),
            notify_secs: default_notify_secs(),
        }
    }
}

fn default_lock_dir() -> PathBuf {
    PathBuf::from("tmp/deploy.lock")
}

fn default_wait_secs() -> u64 {
    3600
}

fn default_notify_secs() -> u64 {
    600
}

/// Repository the pipeline deploys from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    #[serde(default = "default_repo_dir")]
    pub repo_dir: PathBuf,

    #[serde(default = "default_remote")]
    pub remote: String,

    /// Long-lived branch that always matches what is deployed.
    #[serde(default = "default_stable_branch")]
    pub stable_branch: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repo_dir: default_repo_dir(),
            remote: default_remote(),
            stable_branch: default_stable_branch(),
        }
    }
}

fn default_repo_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_stable_branch() -> String {
    "stable".to_string()
}

/// Job runner that re-invokes baton for each stage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Base URL for stage links in chat messages. Empty means links
    /// degrade to copy-pasteable `baton ...` commands.
    #[serde(default)]
    pub url: String,
}

/// Chat room the pipeline narrates into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_chat_room")]
    pub room: String,

    #[serde(default = "default_chat_sender")]
    pub sender: String,

    /// POST endpoint for messages. Unset means log-only delivery.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// GET endpoint listing chat users, for email to @mention lookup.
    #[serde(default)]
    pub directory_url: Option<String>,

    /// Name of the environment variable holding the chat auth token.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            room: default_chat_room(),
            sender: default_chat_sender(),
            webhook_url: None,
            directory_url: None,
            auth_token_env: default_auth_token_env(),
        }
    }
}

fn default_chat_room() -> String {
    "deploys".to_string()
}

fn default_chat_sender() -> String {
    "baton".to_string()
}

fn default_auth_token_env() -> String {
    "BATON_CHAT_TOKEN".to_string()
}

/// Hosting-platform commands and addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Account the deploy tooling authenticates as.
    #[serde(default = "default_deploy_user")]
    pub deploy_user: String,

    /// File holding that account's secret. A leading `~` is expanded.
    #[serde(default = "default_credential_file")]
    pub credential_file: String,

    /// Endpoint reporting which version serves live traffic.
    #[serde(default)]
    pub live_version_url: Option<String>,

    /// Per-version preview URL template; `{version}` is substituted.
    #[serde(default)]
    pub preview_url: String,

    /// Instances to warm before a version takes traffic.
    #[serde(default = "default_prime_instances")]
    pub prime_instances: u32,

    /// Command prefix for mutating platform operations (prime, switch).
    #[serde(default)]
    pub deploy_cmd: String,

    /// Command prefix for monitoring operations (baseline, watch).
    #[serde(default)]
    pub monitor_cmd: String,

    /// Post-switch monitoring window.
    #[serde(default = "default_monitor_minutes")]
    pub monitor_minutes: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            deploy_user: default_deploy_user(),
            credential_file: default_credential_file(),
            live_version_url: None,
            preview_url: String::new(),
            prime_instances: default_prime_instances(),
            deploy_cmd: String::new(),
            monitor_cmd: String::new(),
            monitor_minutes: default_monitor_minutes(),
        }
    }
}

impl PlatformConfig {
    /// Credential file with a leading `~` expanded to the real home directory.
    pub fn credential_path(&self) -> PathBuf {
        loader::expand_tilde(&self.credential_file)
    }
}

fn default_deploy_user() -> String {
    "prod-deploy@example.com".to_string()
}

fn default_credential_file() -> String {
    "~/prod-deploy.pw".to_string()
}

fn default_prime_instances() -> u32 {
    100
}

fn default_monitor_minutes() -> u32 {
    10
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub lock: LockConfig,

    #[serde(default)]
    pub git: GitConfig,

    #[serde(default)]
    pub runner: RunnerConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub platform: PlatformConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> BatonResult<Self> {
        let (config, _warnings) = loader::load_with_warnings(path)?;
        Ok(config)
    }

    /// Load configuration and collect non-fatal warnings (e.g. unknown keys).
    pub fn load_with_warnings(path: &Path) -> BatonResult<(Self, Vec<ConfigWarning>)> {
        loader::load_with_warnings(path)
    }

    /// Load from an explicit file, the project config, the user config, or
    /// defaults, in that order.
    pub fn load_or_default(explicit: Option<&Path>) -> BatonResult<(Self, Vec<ConfigWarning>)> {
        loader::load_or_default(explicit)
    }
}
