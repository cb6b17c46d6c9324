//! Alert building and delivery
//!
//! Thin builder over the `Notifier` port. Alerts are attributed to the
//! deployer's chat mention by default and are logged even when chat
//! delivery fails; a chat outage must never fail a deploy stage.

use crate::domain::entities::DeployRecord;
use crate::domain::ports::{Color, Notice, Notifier, Severity};

/// One alert under construction
#[derive(Debug, Clone)]
pub struct Alert {
    text: String,
    severity: Severity,
    color: Option<Color>,
    rich_text: bool,
    attribute: bool,
}

impl Alert {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            severity: Severity::Info,
            color: None,
            rich_text: false,
            attribute: true,
        }
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    /// Text carries markup (links); deliver as rich text
    pub fn rich(mut self) -> Self {
        self.rich_text = true;
        self
    }

    /// Do not prefix the deployer mention
    ///
    /// Used when the attribution itself would be unverified, e.g. alerting
    /// about a token mismatch.
    pub fn unattributed(mut self) -> Self {
        self.attribute = false;
        self
    }

    /// Deliver using the record's channel identity
    pub fn send(&self, notifier: &dyn Notifier, record: &DeployRecord) {
        self.send_to(
            notifier,
            record.chat_room(),
            record.chat_sender(),
            record.deployer_mention(),
        );
    }

    /// Deliver to an explicit channel; used when no record could be loaded
    pub fn send_to(&self, notifier: &dyn Notifier, room: &str, sender: &str, mention: &str) {
        let text = if self.attribute && !mention.is_empty() {
            format!("{}: {}", mention, self.text)
        } else {
            self.text.clone()
        };

        match self.severity {
            Severity::Info => tracing::info!(target: "baton::alert", "{}", text),
            Severity::Warning => tracing::warn!(target: "baton::alert", "{}", text),
            Severity::Error | Severity::Critical => {
                tracing::error!(target: "baton::alert", "{}", text)
            }
        }

        let notice = Notice {
            room: room.to_string(),
            sender: sender.to_string(),
            text,
            severity: self.severity,
            color: self.color,
            rich_text: self.rich_text,
        };
        if let Err(err) = notifier.send(&notice) {
            tracing::warn!("could not deliver notification: {}", err);
        }
    }
}
