//! Baton CLI - release pipeline coordinator
//!
//! Usage: baton <ACTION> [flags]
//!
//! Every invocation runs exactly one pipeline stage against the shared
//! lock directory and exits; the chain continues when a human clicks the
//! next chat link or the job runner fires the follow-up stage.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use baton::application::{
    BranchSync, DispatchOutcome, LockManager, LockSettings, Pipeline, PropertyStore,
    RollbackController,
};
use baton::cli::Cli;
use baton::config::Config;
use baton::domain::ports::PlatformQuery;
use baton::domain::value_objects::Action;
use baton::infrastructure::{
    ChatDirectory, ChatNotifier, CommandExecutor, GitCli, GitVersionNamer, HttpPlatformQuery,
    PropFileStore, SystemClock,
};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(outcome) => {
            if outcome.success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "baton=debug,info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: &Cli) -> Result<DispatchOutcome> {
    let (config, warnings) = Config::load_or_default(cli.config.as_deref())?;
    for warning in &warnings {
        match &warning.suggestion {
            Some(suggestion) => tracing::warn!(
                "unknown config key '{}' in {} (did you mean '{}'?)",
                warning.key,
                warning.file.display(),
                suggestion
            ),
            None => tracing::warn!(
                "unknown config key '{}' in {}",
                warning.key,
                warning.file.display()
            ),
        }
    }

    let mut invocation = cli.invocation(&config);
    // Stage links re-run baton from wherever the runner happens to be,
    // so the recorded lock path must not depend on the working directory.
    invocation.lock_dir = std::path::absolute(&invocation.lock_dir)?;

    let auth_token = std::env::var(&config.chat.auth_token_env).ok();

    let store = Arc::new(PropFileStore::new());
    let namer = Arc::new(GitVersionNamer::new(
        &config.git.repo_dir,
        &config.git.remote,
    ));
    let directory = Arc::new(ChatDirectory::new(
        config.chat.directory_url.clone(),
        auth_token.clone(),
    )?);
    let clock = Arc::new(SystemClock::new());
    let notifier = Arc::new(ChatNotifier::new(
        config.chat.webhook_url.clone(),
        auth_token,
    )?);
    let vcs = Arc::new(GitCli::new(&config.git.repo_dir, &config.git.remote));
    let executor = Arc::new(CommandExecutor::new(
        &config.platform.deploy_cmd,
        &config.platform.monitor_cmd,
    ));
    let platform = Arc::new(HttpPlatformQuery::new(
        config.platform.live_version_url.clone(),
    )?);

    // A deploy that goes bad rolls back to whatever is live right now.
    if invocation.action == Action::AcquireLock && invocation.rollback_to.is_empty() {
        invocation.rollback_to = platform
            .current_live_version()
            .context("cannot determine the version to roll back to")?;
    }

    let props = PropertyStore::new(store, namer, directory, clock.clone());
    let lock = LockManager::new(
        props.clone(),
        notifier.clone(),
        clock,
        LockSettings {
            wait: Duration::from_secs(config.lock.wait_secs),
            notify_every: Duration::from_secs(config.lock.notify_secs),
        },
    );
    let sync = BranchSync::new(vcs.clone(), &config.git.stable_branch, &config.git.remote);
    let rollback = RollbackController::new(
        executor,
        platform.clone(),
        vcs.clone(),
        notifier.clone(),
        config.platform.prime_instances,
    );
    let pipeline = Pipeline::new(
        props,
        lock,
        sync,
        rollback,
        vcs,
        platform,
        notifier,
        Cli::settings(&config),
    );

    Ok(pipeline.dispatch(&invocation))
}
