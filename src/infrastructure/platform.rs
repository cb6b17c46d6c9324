//! Hosting-platform adapters
//!
//! `CommandExecutor` drives the configured deploy/monitor tools as
//! subprocesses. The contract with those tools is small: arguments name
//! the operation, the credential arrives on stdin (never argv, where other
//! users could read it), and the watch tool reports a regression with exit
//! code 2 so it stays distinguishable from the tool itself breaking.
//!
//! `HttpPlatformQuery` answers the one read-only question the pipeline
//! has: which version serves live traffic right now.

use std::process::{Command, Stdio};

use crate::domain::ports::{
    CredentialRef, DeployExecutor, MonitoringBaseline, PlatformQuery, WatchVerdict,
};
use crate::error::{BatonError, BatonResult};
use crate::infrastructure::http;

/// Exit code the watch tool uses for "the new version looks bad"
const REGRESSION_EXIT: i32 = 2;

/// Subprocess-backed `DeployExecutor`
pub struct CommandExecutor {
    deploy_cmd: String,
    monitor_cmd: String,
}

impl CommandExecutor {
    pub fn new(deploy_cmd: impl Into<String>, monitor_cmd: impl Into<String>) -> Self {
        Self {
            deploy_cmd: deploy_cmd.into(),
            monitor_cmd: monitor_cmd.into(),
        }
    }
}

/// Whitespace-split command prefix; quoting is deliberately unsupported,
/// wrap complex invocations in a script instead.
fn base_command(base: &str, step: &str) -> BatonResult<Command> {
    let mut parts = base.split_whitespace();
    let Some(program) = parts.next() else {
        return Err(BatonError::ExecutorFailed {
            step: step.to_string(),
            message: "no platform command configured".to_string(),
        });
    };
    let mut cmd = Command::new(program);
    cmd.args(parts);
    Ok(cmd)
}

fn capture(
    mut cmd: Command,
    step: &str,
    stdin_data: Option<&[u8]>,
) -> BatonResult<std::process::Output> {
    tracing::debug!(step, "platform command");
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });

    let fail = |message: String| BatonError::ExecutorFailed {
        step: step.to_string(),
        message,
    };

    let mut child = cmd.spawn().map_err(|e| fail(e.to_string()))?;
    if let Some(data) = stdin_data {
        if let Some(stdin) = child.stdin.as_mut() {
            use std::io::Write;
            stdin.write_all(data).map_err(|e| fail(e.to_string()))?;
        }
    }
    child.wait_with_output().map_err(|e| fail(e.to_string()))
}

fn demand_success(output: std::process::Output, step: &str) -> BatonResult<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(BatonError::ExecutorFailed {
            step: step.to_string(),
            message: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl DeployExecutor for CommandExecutor {
    fn prime_instances(&self, version: &str, count: u32) -> BatonResult<()> {
        tracing::info!(version, count, "priming instances");
        let mut cmd = base_command(&self.deploy_cmd, "prime")?;
        cmd.args(["prime", "--version", version, "--instances"])
            .arg(count.to_string());
        let output = capture(cmd, "prime", None)?;
        demand_success(output, "prime")?;
        Ok(())
    }

    fn switch_live(&self, version: &str, credentials: &CredentialRef) -> BatonResult<()> {
        tracing::info!(version, user = %credentials.user, "switching live traffic");
        let secret =
            std::fs::read_to_string(&credentials.secret_file).map_err(|e| {
                BatonError::ExecutorFailed {
                    step: "set-default".to_string(),
                    message: format!(
                        "could not read credential file {}: {}",
                        credentials.secret_file.display(),
                        e
                    ),
                }
            })?;

        let mut cmd = base_command(&self.deploy_cmd, "set-default")?;
        cmd.args(["set-default", "--version", version, "--user", &credentials.user]);
        let output = capture(cmd, "set-default", Some(secret.trim().as_bytes()))?;
        demand_success(output, "set-default")?;
        Ok(())
    }

    fn monitoring_baseline(&self, window_minutes: u32) -> BatonResult<MonitoringBaseline> {
        let mut cmd = base_command(&self.monitor_cmd, "baseline")?;
        cmd.args(["baseline", "--minutes"])
            .arg(window_minutes.to_string());
        let output = capture(cmd, "baseline", None)?;
        let stdout = demand_success(output, "baseline")?;

        let value = if stdout.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&stdout).map_err(|e| BatonError::ExecutorFailed {
                step: "baseline".to_string(),
                message: format!("unparseable baseline: {}", e),
            })?
        };
        Ok(MonitoringBaseline(value))
    }

    fn watch_for_regressions(
        &self,
        version: &str,
        window_minutes: u32,
        baseline: &MonitoringBaseline,
    ) -> BatonResult<WatchVerdict> {
        let mut cmd = base_command(&self.monitor_cmd, "watch")?;
        cmd.args(["watch", "--version", version, "--minutes"])
            .arg(window_minutes.to_string());

        let payload = serde_json::to_vec(&baseline.0).map_err(|e| BatonError::ExecutorFailed {
            step: "watch".to_string(),
            message: e.to_string(),
        })?;
        let output = capture(cmd, "watch", Some(&payload))?;

        if output.status.success() {
            return Ok(WatchVerdict::Healthy);
        }
        if output.status.code() == Some(REGRESSION_EXIT) {
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let reason = if stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).trim().to_string()
            } else {
                stdout
            };
            return Ok(WatchVerdict::RegressionDetected(reason));
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(BatonError::ExecutorFailed {
            step: "watch".to_string(),
            message: if stderr.is_empty() {
                output.status.to_string()
            } else {
                stderr
            },
        })
    }
}

/// HTTP-backed `PlatformQuery`
pub struct HttpPlatformQuery {
    url: Option<String>,
    client: reqwest::blocking::Client,
}

impl HttpPlatformQuery {
    pub fn new(url: Option<String>) -> BatonResult<Self> {
        Ok(Self {
            url,
            client: http::client()?,
        })
    }
}

impl PlatformQuery for HttpPlatformQuery {
    fn current_live_version(&self) -> BatonResult<String> {
        let Some(url) = &self.url else {
            return Err(BatonError::InvalidState(
                "no live_version_url configured".to_string(),
            ));
        };

        let body = http::get_json_with_retries(&self.client, url, None)?;
        live_version_in(&body).ok_or_else(|| {
            BatonError::InvalidState(format!("version endpoint returned no version_id: {}", body))
        })
    }
}

/// The endpoint reports `<major>.<minor>`; only `<major>` names a deploy.
fn live_version_in(body: &serde_json::Value) -> Option<String> {
    let version_id = body.get("version_id")?.as_str()?;
    let major = version_id.split('.').next().unwrap_or(version_id);
    Some(major.to_string())
}
