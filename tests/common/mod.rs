//! Shared test environment for baton integration tests.
//!
//! `TestEnv` builds one disposable deploy world per test: a work checkout
//! with a local bare origin (base commit on `stable`, one feature commit on
//! `release`), a `baton.toml` pointing everything into the temp directory,
//! and optionally scripted platform tools plus a live-version endpoint.
//! Tests then drive the compiled binary through it.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

/// Result of one run of the baton binary
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr, for assertion failure messages
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated deploy world: git repos, config, lock directory, tool scripts
pub struct TestEnv {
    pub workspace: TempDir,
    home: TempDir,
}

impl TestEnv {
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::new()
    }

    /// Plain environment: git fixture and config, no platform tools
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The work checkout the binary runs in
    pub fn repo(&self) -> PathBuf {
        self.workspace.path().join("repo")
    }

    /// The bare repository standing in for the remote
    pub fn origin(&self) -> PathBuf {
        self.workspace.path().join("origin.git")
    }

    pub fn lock_dir(&self) -> PathBuf {
        self.workspace.path().join("deploy.lock")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.workspace.path().join("deploy.lock.prev")
    }

    /// Run the baton binary from the work checkout
    pub fn run(&self, args: &[&str]) -> TestResult {
        let output = Command::new(env!("CARGO_BIN_EXE_baton"))
            .current_dir(self.repo())
            .args(args)
            .env("HOME", self.home.path())
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("BATON_CHAT_TOKEN")
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to execute baton");
        output_to_result(output)
    }

    /// Raw value of one key in the record under the primary lock directory
    pub fn record_field(&self, key: &str) -> Option<String> {
        self.record_field_in(&self.lock_dir(), key)
    }

    /// Raw value of one key in the record under `dir`
    pub fn record_field_in(&self, dir: &Path, key: &str) -> Option<String> {
        let content = std::fs::read_to_string(dir.join("deploy.props")).ok()?;
        let prefix = format!("{}=", key);
        content
            .lines()
            .find_map(|line| line.strip_prefix(&prefix).map(str::to_string))
    }

    /// The ownership token minted at acquire-lock
    pub fn token(&self) -> String {
        self.record_field("TOKEN")
            .expect("no TOKEN in the deploy record")
    }

    /// Run git in the work checkout; panics on failure
    pub fn git(&self, args: &[&str]) -> String {
        git_in(&self.repo(), args)
    }

    /// Resolve a rev in the bare origin
    pub fn origin_sha(&self, rev: &str) -> String {
        git_in(&self.origin(), &["rev-parse", rev])
    }

    pub fn origin_has_tag(&self, name: &str) -> bool {
        !git_in(&self.origin(), &["tag", "-l", name]).is_empty()
    }

    /// Everything the scripted platform tools were invoked with, in order
    pub fn platform_log(&self) -> String {
        std::fs::read_to_string(self.workspace.path().join("platform.log")).unwrap_or_default()
    }

    /// What the scripted deploy tool saw on stdin during set-default
    pub fn secret_seen(&self) -> String {
        std::fs::read_to_string(self.workspace.path().join("secret.log")).unwrap_or_default()
    }
}

fn output_to_result(output: Output) -> TestResult {
    TestResult {
        success: output.status.success(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

fn git_in(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to execute git");
    assert!(
        output.status.success(),
        "git {:?} failed in {}:\n{}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// Builder for TestEnv
pub struct TestEnvBuilder {
    platform_tools: bool,
    live_endpoint: bool,
    watch_regression: Option<String>,
    fail_switch: bool,
}

impl TestEnvBuilder {
    pub fn new() -> Self {
        Self {
            platform_tools: false,
            live_endpoint: false,
            watch_regression: None,
            fail_switch: false,
        }
    }

    /// Write scripted deploy/monitor tools and a credential file, and point
    /// the config at them
    #[cfg(unix)]
    pub fn with_platform_tools(mut self) -> Self {
        self.platform_tools = true;
        self
    }

    /// Serve the record's VERSION (or `v-prev` before a record exists) from
    /// a local live-version endpoint
    pub fn with_live_endpoint(mut self) -> Self {
        self.live_endpoint = true;
        self
    }

    /// Make the scripted watch tool report a regression
    #[cfg(unix)]
    pub fn with_regression(mut self, reason: &str) -> Self {
        self.watch_regression = Some(reason.to_string());
        self
    }

    /// Make the scripted set-default step fail
    #[cfg(unix)]
    pub fn with_failing_switch(mut self) -> Self {
        self.fail_switch = true;
        self
    }

    pub fn build(self) -> TestEnv {
        let workspace = TempDir::new().expect("failed to create workspace temp dir");
        let home = TempDir::new().expect("failed to create home temp dir");
        let ws = workspace.path();

        build_git_fixture(ws);

        let mut platform_section = String::new();
        if self.platform_tools {
            #[cfg(unix)]
            write_platform_tools(ws, self.watch_regression.as_deref(), self.fail_switch);
            std::fs::write(ws.join("deploy.pw"), "hunter2\n").expect("failed to write secret");
            platform_section.push_str(&format!(
                "deploy_cmd = \"{}\"\nmonitor_cmd = \"{}\"\n\
                 credential_file = \"{}\"\nprime_instances = 4\nmonitor_minutes = 0\n",
                ws.join("bin/deploy-tool").display(),
                ws.join("bin/monitor-tool").display(),
                ws.join("deploy.pw").display(),
            ));
        }
        if self.live_endpoint {
            let url = live_version_responder(ws.join("deploy.lock"));
            platform_section.push_str(&format!("live_version_url = \"{}\"\n", url));
        }

        let mut config = format!(
            "[lock]\ndir = \"{}\"\nwait_secs = 0\n\n\
             [git]\nrepo_dir = \".\"\nremote = \"origin\"\nstable_branch = \"stable\"\n",
            ws.join("deploy.lock").display(),
        );
        if !platform_section.is_empty() {
            config.push_str("\n[platform]\n");
            config.push_str(&platform_section);
        }
        std::fs::write(ws.join("repo/baton.toml"), config).expect("failed to write baton.toml");

        TestEnv { workspace, home }
    }
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Bare origin plus a work clone: `main` and `stable` at a base commit,
/// `release` one feature commit ahead, everything pushed and tracked
fn build_git_fixture(ws: &Path) {
    let origin = ws.join("origin.git");
    std::fs::create_dir(&origin).expect("failed to create origin dir");
    git_in(ws, &["init", "-q", "--bare", "origin.git"]);

    let repo = ws.join("repo");
    std::fs::create_dir(&repo).expect("failed to create repo dir");
    git_in(ws, &["init", "-q", "-b", "main", "repo"]);
    git_in(&repo, &["config", "user.email", "tests@example.com"]);
    git_in(&repo, &["config", "user.name", "Baton Tests"]);

    std::fs::write(repo.join("app.txt"), "base\n").expect("failed to write fixture file");
    git_in(&repo, &["add", "app.txt"]);
    git_in(&repo, &["commit", "-q", "-m", "base"]);
    git_in(&repo, &["branch", "-q", "stable"]);

    git_in(&repo, &["checkout", "-q", "-b", "release"]);
    std::fs::write(repo.join("app.txt"), "base\nfeature\n").expect("failed to write fixture file");
    git_in(&repo, &["commit", "-q", "-am", "feature work"]);

    git_in(&repo, &["remote", "add", "origin", origin.to_str().unwrap()]);
    git_in(&repo, &["push", "-q", "origin", "main", "stable", "release"]);
    git_in(&repo, &["fetch", "-q", "origin"]);
}

#[cfg(unix)]
fn write_platform_tools(ws: &Path, regression: Option<&str>, fail_switch: bool) {
    use std::os::unix::fs::PermissionsExt;

    let bin = ws.join("bin");
    std::fs::create_dir(&bin).expect("failed to create bin dir");
    let log = ws.join("platform.log");
    let secrets = ws.join("secret.log");

    let switch_tail = if fail_switch { "exit 1" } else { ":" };
    let deploy = format!(
        "#!/bin/sh\necho \"deploy $@\" >> {log}\n\
         if [ \"$1\" = \"set-default\" ]; then\n  cat >> {secrets}\n  {switch_tail}\nfi\nexit 0\n",
        log = log.display(),
        secrets = secrets.display(),
    );

    let watch_body = match regression {
        Some(reason) => format!("cat > /dev/null\necho '{}'\nexit 2", reason),
        None => "cat > /dev/null".to_string(),
    };
    let monitor = format!(
        "#!/bin/sh\necho \"monitor $@\" >> {log}\ncase \"$1\" in\n\
         baseline) echo '{{\"requests\": 120, \"errors\": 0}}' ;;\n\
         watch) {watch}\n;;\nesac\nexit 0\n",
        log = log.display(),
        watch = watch_body,
    );

    for (name, body) in [("deploy-tool", deploy), ("monitor-tool", monitor)] {
        let path = bin.join(name);
        std::fs::write(&path, body).expect("failed to write tool script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod tool script");
    }
}

/// One local HTTP endpoint answering the live-version query.
///
/// Serves whatever VERSION the deploy record currently holds, so the
/// version that "went live" during switch-live is the one reported at
/// finish time; before any record exists it serves `v-prev`.
fn live_version_responder(record_dir: PathBuf) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind responder");
    let addr = listener.local_addr().expect("no local addr");

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);

            let version = std::fs::read_to_string(record_dir.join("deploy.props"))
                .ok()
                .and_then(|content| {
                    content
                        .lines()
                        .find_map(|line| line.strip_prefix("VERSION=").map(str::to_string))
                })
                .unwrap_or_else(|| "v-prev".to_string());

            let body = format!("{{\"version_id\": \"{}.1\"}}", version);
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    format!("http://{}/live-version", addr)
}
