//! Command-line interface
//!
//! One binary, one positional stage name. The job runner re-invokes
//! `baton <action>` for every pipeline stage, so the surface stays flat:
//! no subcommand tree, just the action plus the parameters a stage can
//! need. Flags beat config; config beats built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::application::{Invocation, PipelineSettings};
use crate::config::Config;
use crate::domain::value_objects::Action;

/// Baton - lock-protected release pipeline coordinator
#[derive(Parser, Debug)]
#[command(name = "baton")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Stages are normally driven by chat links, not typed by hand.")]
pub struct Cli {
    /// Pipeline stage to run
    #[arg(value_enum)]
    pub action: Action,

    /// Lock directory (default: [lock] dir from config)
    #[arg(long)]
    pub lock_dir: Option<PathBuf>,

    /// Ownership token; generated at acquire-lock when omitted
    #[arg(long, default_value = "")]
    pub token: String,

    /// Email of the person deploying
    #[arg(long, default_value = "unknown-user@example.com")]
    pub deployer: String,

    /// Branch or commit to deploy
    #[arg(long, default_value = "")]
    pub revision: String,

    /// Run the whole pipeline without manual-testing stops
    #[arg(long)]
    pub auto_deploy: bool,

    /// Version to roll back to if this deploy goes bad (default: whatever
    /// is serving live traffic at acquire-lock)
    #[arg(long, default_value = "")]
    pub rollback_to: String,

    /// Minutes to watch monitoring after the traffic switch (default:
    /// [platform] monitor_minutes from config)
    #[arg(long)]
    pub monitor_minutes: Option<u32>,

    /// URL of the CI build running this stage, used for cancel links
    #[arg(long)]
    pub build_url: Option<String>,

    /// Email of whoever triggered this stage, for attribution when the
    /// deploy record is gone
    #[arg(long, default_value = "")]
    pub caller: String,

    /// Config file (default: ./baton.toml, then the user config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Merge flags with config into one stage invocation.
    ///
    /// An acquire-lock without a token mints one here; every later stage
    /// must present the minted token back.
    pub fn invocation(&self, config: &Config) -> Invocation {
        let token = if self.token.is_empty() && self.action == Action::AcquireLock {
            uuid::Uuid::new_v4().to_string()
        } else {
            self.token.clone()
        };

        // Whoever clicked the link is the deployer unless told otherwise.
        let caller = if self.caller.is_empty() {
            self.deployer.clone()
        } else {
            self.caller.clone()
        };

        Invocation {
            action: self.action,
            lock_dir: self
                .lock_dir
                .clone()
                .unwrap_or_else(|| config.lock.dir.clone()),
            token,
            deployer: self.deployer.clone(),
            revision: self.revision.clone(),
            auto_deploy: self.auto_deploy,
            rollback_to: self.rollback_to.clone(),
            monitor_minutes: self
                .monitor_minutes
                .unwrap_or(config.platform.monitor_minutes),
            build_url: self.build_url.clone(),
            caller,
        }
    }

    /// The per-deploy settings every fresh record is seeded with.
    pub fn settings(config: &Config) -> PipelineSettings {
        PipelineSettings {
            chat_room: config.chat.room.clone(),
            chat_sender: config.chat.sender.clone(),
            runner_url: config.runner.url.clone(),
            deploy_user: config.platform.deploy_user.clone(),
            credential_file: config.platform.credential_path(),
            preview_url: config.platform.preview_url.clone(),
        }
    }
}
