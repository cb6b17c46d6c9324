//! Recovery link building
//!
//! Notifications carry links that re-invoke the pipeline through the job
//! runner with a different stage argument. When no runner URL is known the
//! equivalent CLI command is rendered instead, so the recipient always gets
//! something they can act on.

use crate::domain::entities::DeployRecord;
use crate::domain::value_objects::Action;

/// Link (or command) that runs `action` against the record's own deploy
///
/// The ownership token rides along so the holder's job runner can prove it
/// owns the lock; extra query parameters are appended as given.
pub fn action_link(record: &DeployRecord, action: Action, extra: &[(&str, &str)]) -> String {
    let runner = record.runner_url().trim_end_matches('/').to_string();
    if runner.is_empty() {
        return command_form(record, action);
    }

    let base = format!("{}/run/{}", runner, action.name());
    let mut params: Vec<(&str, &str)> = vec![("token", record.token())];
    params.extend_from_slice(extra);
    match reqwest::Url::parse_with_params(&base, &params) {
        Ok(url) => url.to_string(),
        Err(_) => command_form(record, action),
    }
}

/// Link that cancels a not-yet-finished deploy
pub fn cancel_link(record: &DeployRecord) -> String {
    action_link(record, Action::FinishFailure, &[])
}

/// Link that stops a runner build in flight (the monitoring watcher)
pub fn stop_build_link(build_url: &str) -> String {
    format!("{}/stop", build_url.trim_end_matches('/'))
}

fn command_form(record: &DeployRecord, action: Action) -> String {
    let mut cmd = format!("baton {} --lock-dir {}", action.name(), record.lock_dir().display());
    if !record.token().is_empty() {
        cmd.push_str(&format!(" --token {}", record.token()));
    }
    cmd
}
