use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque stable identifier for one chat thread on one surface.
///
/// This is the dedup key: the watch loop keys its seen-state on it, so two
/// threads on the same surface must never share an id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Provider type for chain configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Anthropic,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// A message observed on a surface, immutable once read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub conversation: ConversationId,
    /// Display label of the sender as the surface reports it.
    pub sender: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub observed_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn new(
        conversation: impl Into<ConversationId>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation: conversation.into(),
            sender: sender.into(),
            text: text.into(),
            observed_at: Utc::now(),
        }
    }
}

/// A generated reply ready to send back to the surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyDraft {
    pub conversation: ConversationId,
    pub text: String,
    /// Name of the provider that produced the text.
    pub provider: String,
}

/// How a dispatch ended, from the observer's point of view.
///
/// `GenerationFailed` and `DeliveryFailed` are distinct because the
/// remediation differs: regenerate vs retry the send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Reply generated and delivered.
    Replied,
    /// Every provider in the chain failed; nothing was sent.
    GenerationFailed,
    /// Reply generated but the surface send failed.
    DeliveryFailed,
}

/// One event per completed dispatch, broadcast to observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub conversation: ConversationId,
    pub inbound_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub outcome: DispatchOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_roundtrip() {
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderKind::Gemini.to_string(), "gemini");

        assert_eq!(
            "anthropic".parse::<ProviderKind>().unwrap(),
            ProviderKind::Anthropic
        );
        assert_eq!(
            "Gemini".parse::<ProviderKind>().unwrap(),
            ProviderKind::Gemini
        );
        assert!("whatsapp-ai".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_conversation_id_as_key() {
        use std::collections::HashMap;

        let mut seen: HashMap<ConversationId, String> = HashMap::new();
        seen.insert(ConversationId::from("tg:42"), "hi".to_string());

        assert_eq!(seen.get(&ConversationId::from("tg:42")).unwrap(), "hi");
        assert!(!seen.contains_key(&ConversationId::from("tg:43")));
    }

    #[test]
    fn test_dispatch_event_serialization() {
        let event = DispatchEvent {
            conversation: ConversationId::from("tg:42"),
            inbound_text: "hi".to_string(),
            reply_text: Some("hello!".to_string()),
            provider: Some("anthropic".to_string()),
            outcome: DispatchOutcome::Replied,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"outcome\":\"replied\""));
        assert!(json.contains("\"conversation\":\"tg:42\""));

        let decoded: DispatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.outcome, DispatchOutcome::Replied);
        assert_eq!(decoded.provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn test_dispatch_event_failure_has_no_reply() {
        let event = DispatchEvent {
            conversation: ConversationId::from("tg:7"),
            inbound_text: "hi".to_string(),
            reply_text: None,
            provider: None,
            outcome: DispatchOutcome::GenerationFailed,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("reply_text"));
        assert!(json.contains("\"outcome\":\"generation_failed\""));
    }
}
