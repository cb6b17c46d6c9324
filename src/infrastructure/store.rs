//! Prop-file record store
//!
//! Persists the deploy record as sorted `KEY=value` lines in a file inside
//! the lock directory. Sorted output keeps no-op rewrites byte-identical,
//! which makes "did anything change" checks trivial in tests and during
//! incident archaeology.
//!
//! Values are escaped (`\\`, `\n`, `\r`) so multi-line error messages
//! survive the one-line-per-key format.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::domain::entities::DeployRecord;
use crate::domain::ports::RecordStore;
use crate::error::{BatonError, BatonResult};

/// File name inside the lock directory
pub const RECORD_FILE: &str = "deploy.props";

/// `key=value` file persistence for the deploy record
#[derive(Debug, Clone, Default)]
pub struct PropFileStore;

impl PropFileStore {
    pub fn new() -> Self {
        Self
    }
}

impl RecordStore for PropFileStore {
    fn load(&self, dir: &Path) -> BatonResult<DeployRecord> {
        let path = dir.join(RECORD_FILE);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(BatonError::NotFound {
                    dir: dir.to_path_buf(),
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut fields = BTreeMap::new();
        for line in content.lines() {
            // Unknown garbage lines are dropped rather than fatal; the
            // lock-dir check below catches a genuinely wrong file.
            if let Some((key, value)) = line.split_once('=') {
                fields.insert(key.to_string(), unescape(value));
            }
        }

        let record = DeployRecord::from_fields(fields);
        if record.lock_dir() != dir {
            return Err(BatonError::Corrupt {
                dir: dir.to_path_buf(),
                recorded: record.lock_dir().display().to_string(),
            });
        }

        tracing::debug!(dir = %dir.display(), "read deploy record");
        Ok(record)
    }

    fn save(&self, record: &DeployRecord) -> BatonResult<()> {
        let dir = record.lock_dir();
        let path = dir.join(RECORD_FILE);

        let mut content = String::new();
        for (key, value) in record.fields() {
            content.push_str(key);
            content.push('=');
            content.push_str(&escape(value));
            content.push('\n');
        }

        // Write-then-rename: a crash mid-save leaves the previous record,
        // never a truncated one.
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        tracing::debug!(dir = %dir.display(), "wrote deploy record");
        Ok(())
    }

    fn exists(&self, dir: &Path) -> bool {
        dir.join(RECORD_FILE).is_file()
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            // Trailing or unknown escape: keep the text as written.
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
