//! Configuration loading

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BatonError, BatonResult};

use super::types::Config;

/// File looked for in the working directory.
pub const PROJECT_CONFIG: &str = "baton.toml";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> BatonResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| BatonError::InvalidConfig {
        file: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key: key.clone(),
                file: path.to_path_buf(),
                line: find_line_number(&content, &key),
                suggestion: suggest_key(&key),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load from an explicit file, `./baton.toml`, the user config, or defaults.
///
/// A config file that exists but cannot be parsed is an error, never a
/// silent fall-through: deploying with half-applied settings is worse than
/// not deploying.
pub fn load_or_default(explicit: Option<&Path>) -> BatonResult<(Config, Vec<ConfigWarning>)> {
    if let Some(path) = explicit {
        tracing::debug!(file = %path.display(), "loading config");
        return load_with_warnings(path);
    }

    let project_config = PathBuf::from(PROJECT_CONFIG);
    if project_config.exists() {
        tracing::debug!(file = %project_config.display(), "loading project config");
        return load_with_warnings(&project_config);
    }

    if let Some(user_config) = user_config_path() {
        if user_config.exists() {
            tracing::debug!(file = %user_config.display(), "loading user config");
            return load_with_warnings(&user_config);
        }
    }

    Ok((Config::default(), Vec::new()))
}

/// Expand a leading `~` or `~/` to the user's home directory.
///
/// Anything else passes through untouched, as does `~` when no home
/// directory can be resolved.
pub fn expand_tilde(raw: &str) -> PathBuf {
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("baton/config.toml"))
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    for (i, line) in content.lines().enumerate() {
        if line.contains(needle) {
            return Some(i + 1);
        }
    }
    None
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "lock",
        "dir",
        "wait_secs",
        "notify_secs",
        "git",
        "repo_dir",
        "remote",
        "stable_branch",
        "runner",
        "url",
        "chat",
        "room",
        "sender",
        "webhook_url",
        "directory_url",
        "auth_token_env",
        "platform",
        "deploy_user",
        "credential_file",
        "live_version_url",
        "preview_url",
        "prime_instances",
        "deploy_cmd",
        "monitor_cmd",
        "monitor_minutes",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

// Single-row edit distance; key names are short so this stays cheap.
fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let b_len = b.chars().count();
    let mut row: Vec<usize> = (0..=b_len).collect();

    for (i, ac) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for (j, bc) in b.chars().enumerate() {
            let subst = if ac == bc { diag } else { diag + 1 };
            diag = row[j + 1];
            row[j + 1] = subst.min(row[j] + 1).min(diag + 1);
        }
    }

    row[b_len]
}
