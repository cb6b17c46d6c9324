//! Notifier port - the system's only human interface
//!
//! Every failure and every significant transition becomes a notification
//! carrying a concrete next action (a link or a command). There is no
//! dashboard; if a message is not sent here, nobody learns about it.

use crate::error::BatonResult;

/// How loud the message is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

/// Chat-side message color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Green,
    Yellow,
    Red,
    Purple,
    Gray,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Green => "green",
            Color::Yellow => "yellow",
            Color::Red => "red",
            Color::Purple => "purple",
            Color::Gray => "gray",
        }
    }
}

/// One outgoing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Channel to deliver to
    pub room: String,
    /// Displayed sender name
    pub sender: String,
    pub text: String,
    pub severity: Severity,
    pub color: Option<Color>,
    /// Text contains markup (links) rather than plain text
    pub rich_text: bool,
}

/// Abstract notification delivery
///
/// Implementations:
/// - `ChatNotifier` - structured log line plus an optional chat webhook
pub trait Notifier: Send + Sync {
    fn send(&self, notice: &Notice) -> BatonResult<()>;
}
