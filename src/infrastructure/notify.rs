//! Chat delivery and people-directory lookup
//!
//! `ChatNotifier` POSTs one JSON message per notice to the configured
//! webhook. `ChatDirectory` resolves a deployer email to an @mention
//! handle via the chat user directory. The auth token never appears in
//! config or on disk, only in the environment variable named there.

use crate::domain::ports::{Color, DirectoryLookup, Notice, Notifier, Severity};
use crate::error::{BatonError, BatonResult};
use crate::infrastructure::http;

/// Webhook-backed `Notifier`
///
/// Without a webhook URL every notice is log-only, which keeps local runs
/// and tests quiet without a special mode.
pub struct ChatNotifier {
    webhook_url: Option<String>,
    auth_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl ChatNotifier {
    pub fn new(webhook_url: Option<String>, auth_token: Option<String>) -> BatonResult<Self> {
        Ok(Self {
            webhook_url,
            auth_token,
            client: http::client()?,
        })
    }
}

impl Notifier for ChatNotifier {
    fn send(&self, notice: &Notice) -> BatonResult<()> {
        let Some(url) = &self.webhook_url else {
            tracing::debug!("no chat webhook configured; message logged only");
            return Ok(());
        };

        let payload = serde_json::json!({
            "room": notice.room,
            "from": notice.sender,
            "message": notice.text,
            "color": color_name(notice),
            "message_format": if notice.rich_text { "html" } else { "text" },
            "notify": true,
        });

        let mut request = self.client.post(url).json(&payload);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|e| BatonError::Notify(e.to_string()))?;
        if !response.status().is_success() {
            return Err(BatonError::Notify(format!(
                "webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn color_name(notice: &Notice) -> &'static str {
    match notice.color {
        Some(color) => color.as_str(),
        None => match notice.severity {
            Severity::Info => Color::Gray.as_str(),
            Severity::Warning => Color::Yellow.as_str(),
            Severity::Error | Severity::Critical => Color::Red.as_str(),
        },
    }
}

/// Directory-backed `DirectoryLookup`
///
/// Expects `{"users": [{"email": ..., "mention_name": ...}, ...]}` from
/// the endpoint. Every miss is `Ok(None)`; callers guess a handle from
/// the email instead.
pub struct ChatDirectory {
    url: Option<String>,
    auth_token: Option<String>,
    client: reqwest::blocking::Client,
}

impl ChatDirectory {
    pub fn new(url: Option<String>, auth_token: Option<String>) -> BatonResult<Self> {
        Ok(Self {
            url,
            auth_token,
            client: http::client()?,
        })
    }
}

impl DirectoryLookup for ChatDirectory {
    fn mention_for(&self, identity: &str) -> BatonResult<Option<String>> {
        let Some(url) = &self.url else {
            return Ok(None);
        };

        let body = http::get_json_with_retries(&self.client, url, self.auth_token.as_deref())?;
        Ok(mention_in(&body, identity))
    }
}

fn mention_in(body: &serde_json::Value, identity: &str) -> Option<String> {
    let users = body.get("users")?.as_array()?;
    for user in users {
        if user.get("email").and_then(|e| e.as_str()) == Some(identity) {
            return user
                .get("mention_name")
                .and_then(|m| m.as_str())
                .map(|m| format!("@{}", m));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_webhook_means_log_only_success() {
        let notifier = ChatNotifier::new(None, None).unwrap();
        let notice = Notice {
            room: "deploys".to_string(),
            sender: "baton".to_string(),
            text: "hello".to_string(),
            severity: Severity::Info,
            color: None,
            rich_text: false,
        };
        assert!(notifier.send(&notice).is_ok());
    }

    #[test]
    fn severity_picks_the_default_color() {
        let mut notice = Notice {
            room: String::new(),
            sender: String::new(),
            text: String::new(),
            severity: Severity::Info,
            color: None,
            rich_text: false,
        };
        assert_eq!(color_name(&notice), "gray");

        notice.severity = Severity::Warning;
        assert_eq!(color_name(&notice), "yellow");

        notice.severity = Severity::Critical;
        assert_eq!(color_name(&notice), "red");

        notice.color = Some(Color::Purple);
        assert_eq!(color_name(&notice), "purple");
    }

    #[test]
    fn no_directory_url_means_no_mention() {
        let directory = ChatDirectory::new(None, None).unwrap();
        assert_eq!(directory.mention_for("jan@example.com").unwrap(), None);
    }

    #[test]
    fn mention_lookup_matches_on_email() {
        let body = json!({
            "users": [
                {"email": "ana@example.com", "mention_name": "ana"},
                {"email": "jan@example.com", "mention_name": "jan_d"},
            ]
        });

        assert_eq!(
            mention_in(&body, "jan@example.com"),
            Some("@jan_d".to_string())
        );
        assert_eq!(mention_in(&body, "zoe@example.com"), None);
    }

    #[test]
    fn malformed_directory_body_is_a_miss() {
        assert_eq!(mention_in(&json!({"error": "nope"}), "jan@example.com"), None);
        assert_eq!(mention_in(&json!({"users": "not a list"}), "x"), None);
    }
}
