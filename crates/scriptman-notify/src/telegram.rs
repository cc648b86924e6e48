//! Telegram notifier transport.

use crate::event::{EventKind, ScriptEvent};
use crate::gateway::Notifier;
use async_trait::async_trait;
use scriptman_common::{ScriptError, ScriptResult};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Notifier that delivers lifecycle events as Telegram chat messages via
/// the Bot API `sendMessage` method.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base(DEFAULT_API_BASE, bot_token, chat_id)
    }

    /// Construct against a non-default API base (used by tests to point at
    /// a local stub server).
    pub fn with_api_base(
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        }
    }

    /// Render the chat message for an event (HTML parse mode).
    pub fn render_message(event: &ScriptEvent) -> String {
        let mut message = match event.kind {
            EventKind::Started => format!("🚀 Script <b>{}</b> started", event.script),
            EventKind::Completed => {
                format!("✅ Script <b>{}</b> completed successfully", event.script)
            }
            EventKind::Failed => match event.exit_code {
                Some(code) => format!(
                    "❌ Script <b>{}</b> failed with exit code {}",
                    event.script, code
                ),
                None => format!("❌ Script <b>{}</b> failed", event.script),
            },
            EventKind::Stopped => format!("⏹️ Script <b>{}</b> stopped", event.script),
        };

        if event.kind == EventKind::Failed {
            if let Some(ref detail) = event.message {
                message.push_str(&format!("\n<pre>{}</pre>", detail));
            }
        }

        message
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, event: ScriptEvent) -> ScriptResult<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let payload = json!({
            "chat_id": self.chat_id,
            "text": Self::render_message(&event),
            "parse_mode": "HTML",
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScriptError::notify_failed(e.to_string()))?;

        response
            .error_for_status()
            .map_err(|e| ScriptError::notify_failed(e.to_string()))?;

        debug!(script = %event.script, kind = %event.kind, "Telegram notification delivered");
        Ok(())
    }
}
