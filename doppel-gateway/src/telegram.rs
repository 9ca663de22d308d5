//! Telegram Bot API surface adapter.
//!
//! Polls `getUpdates` with an acknowledged offset and normalizes the result
//! to one latest candidate per chat, the shape the watch loop expects from
//! every surface.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::surface::{Surface, SurfaceError};
use doppel_core::{ConversationId, InboundMessage};

/// Telegram Bot API surface
pub struct TelegramSurface {
    http_client: reqwest::Client,
    token: String,
    base_url: String,
    /// Next update id to request; advanced only after a successful read.
    offset: AtomicI64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
struct TelegramMessage {
    chat: Chat,
    from: Option<User>,
    text: Option<String>,
    date: i64,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct User {
    first_name: String,
}

impl TelegramSurface {
    /// Create a new Telegram surface from a bot token.
    pub fn new(token: impl Into<String>) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http_client,
            token: token.into(),
            base_url: "https://api.telegram.org".to_string(),
            offset: AtomicI64::new(0),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }
}

/// Collapse raw updates to the latest text message per chat, plus the next
/// offset to acknowledge. Later updates in the batch win.
fn collapse_updates(updates: Vec<Update>) -> (Vec<InboundMessage>, Option<i64>) {
    let mut next_offset = None;
    let mut latest: BTreeMap<i64, InboundMessage> = BTreeMap::new();

    for update in updates {
        next_offset = Some(next_offset.unwrap_or(0).max(update.update_id + 1));

        let Some(message) = update.message else {
            continue;
        };
        let Some(text) = message.text else {
            continue;
        };

        let sender = message
            .from
            .map(|user| user.first_name)
            .unwrap_or_else(|| "unknown".to_string());
        let observed_at = DateTime::from_timestamp(message.date, 0).unwrap_or_else(Utc::now);

        latest.insert(
            message.chat.id,
            InboundMessage {
                conversation: ConversationId::new(message.chat.id.to_string()),
                sender,
                text,
                observed_at,
            },
        );
    }

    (latest.into_values().collect(), next_offset)
}

#[async_trait::async_trait]
impl Surface for TelegramSurface {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn read_new_messages(&self) -> Result<Vec<InboundMessage>, SurfaceError> {
        let offset = self.offset.load(Ordering::SeqCst);

        let response = self
            .http_client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", "0".to_string())])
            .send()
            .await
            .map_err(SurfaceError::read)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SurfaceError::Read {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: ApiResponse<Vec<Update>> =
            response.json().await.map_err(SurfaceError::read)?;
        if !parsed.ok {
            return Err(SurfaceError::Read {
                message: parsed.description.unwrap_or_else(|| "not ok".to_string()),
            });
        }

        let (messages, next_offset) = collapse_updates(parsed.result.unwrap_or_default());

        // Acknowledge only after a fully parsed read, so a failed tick
        // re-serves the same updates instead of dropping them.
        if let Some(next) = next_offset {
            self.offset.store(next, Ordering::SeqCst);
        }

        Ok(messages)
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        text: &str,
    ) -> Result<(), SurfaceError> {
        let chat_id: i64 = conversation
            .as_str()
            .parse()
            .map_err(|_| SurfaceError::Send {
                message: format!("not a telegram chat id: {}", conversation),
            })?;

        let response = self
            .http_client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": chat_id, "text": text }))
            .send()
            .await
            .map_err(SurfaceError::send)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SurfaceError::Send {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let parsed: ApiResponse<serde_json::Value> =
            response.json().await.map_err(SurfaceError::send)?;
        if !parsed.ok {
            return Err(SurfaceError::Send {
                message: parsed.description.unwrap_or_else(|| "not ok".to_string()),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_updates(json: &str) -> Vec<Update> {
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        parsed.result.unwrap()
    }

    #[test]
    fn test_collapse_keeps_latest_per_chat() {
        let updates = parse_updates(
            r#"{
                "ok": true,
                "result": [
                    {"update_id": 10, "message": {"chat": {"id": 42}, "from": {"first_name": "Bob"}, "text": "first", "date": 1700000000}},
                    {"update_id": 11, "message": {"chat": {"id": 42}, "from": {"first_name": "Bob"}, "text": "second", "date": 1700000002}},
                    {"update_id": 12, "message": {"chat": {"id": 7}, "from": {"first_name": "Eve"}, "text": "hi", "date": 1700000003}}
                ]
            }"#,
        );

        let (messages, next_offset) = collapse_updates(updates);
        assert_eq!(next_offset, Some(13));
        assert_eq!(messages.len(), 2);

        let for_42 = messages
            .iter()
            .find(|m| m.conversation.as_str() == "42")
            .unwrap();
        assert_eq!(for_42.text, "second");
        assert_eq!(for_42.sender, "Bob");
    }

    #[test]
    fn test_collapse_skips_non_text_updates() {
        let updates = parse_updates(
            r#"{
                "ok": true,
                "result": [
                    {"update_id": 20, "message": {"chat": {"id": 1}, "date": 1700000000}},
                    {"update_id": 21}
                ]
            }"#,
        );

        let (messages, next_offset) = collapse_updates(updates);
        assert!(messages.is_empty());
        // Offset still advances past skipped updates.
        assert_eq!(next_offset, Some(22));
    }

    #[test]
    fn test_collapse_empty_batch() {
        let (messages, next_offset) = collapse_updates(Vec::new());
        assert!(messages.is_empty());
        assert_eq!(next_offset, None);
    }

    #[test]
    fn test_error_response_parsing() {
        let parsed: ApiResponse<Vec<Update>> = serde_json::from_str(
            r#"{"ok": false, "description": "Unauthorized", "result": null}"#,
        )
        .unwrap();
        assert!(!parsed.ok);
        assert_eq!(parsed.description.as_deref(), Some("Unauthorized"));
    }
}
