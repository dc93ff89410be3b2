use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::{lenient_timestamp, null_as_default, string_or_number};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatQuery {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

impl ChatQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_language: "en".to_string(),
            target_language: "en".to_string(),
        }
    }

    pub fn with_languages(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_language = source.into();
        self.target_language = target.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatAnswer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceChatAnswer {
    #[serde(default, deserialize_with = "null_as_default")]
    pub original_text: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer: String,
    #[serde(default)]
    pub detected_language: Option<String>,
    #[serde(default)]
    pub translated_text: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Text,
    Voice,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Text => write!(f, "text"),
            MessageKind::Voice => write!(f, "voice"),
        }
    }
}

/// One exchange in the chat: what the patient said and what came back.
///
/// Deserialization is lenient so that history records from the chat backend
/// (which use `query`/`answer` and `created_at`) load into the same type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "query", deserialize_with = "null_as_default")]
    pub text: String,
    #[serde(default, alias = "answer", deserialize_with = "null_as_default")]
    pub response: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: MessageKind,
    #[serde(default = "Utc::now", alias = "created_at", deserialize_with = "timestamp_or_now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

fn timestamp_or_now<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_timestamp(deserializer)?.unwrap_or_else(Utc::now))
}

impl ChatMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            response: response.into(),
            kind,
            timestamp: Utc::now(),
            source_language: None,
            target_language: None,
            detected_language: None,
            translated_text: None,
            file_size: None,
        }
    }

    pub fn from_text_exchange(query: &ChatQuery, answer: &ChatAnswer) -> Self {
        let mut message = Self::new(MessageKind::Text, query.text.clone(), answer.answer.clone());
        message.source_language = Some(query.source_language.clone());
        message.target_language = Some(query.target_language.clone());
        message
    }

    pub fn from_voice_exchange(answer: &VoiceChatAnswer) -> Self {
        let mut message = Self::new(
            MessageKind::Voice,
            answer.original_text.clone(),
            answer.answer.clone(),
        );
        message.detected_language = answer.detected_language.clone();
        message.translated_text = answer.translated_text.clone();
        message.file_size = answer.file_size;
        message
    }

    pub fn apply(&mut self, patch: ChatMessagePatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if let Some(response) = patch.response {
            self.response = response;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(language) = patch.detected_language {
            self.detected_language = Some(language);
        }
        if let Some(translated) = patch.translated_text {
            self.translated_text = Some(translated);
        }
    }
}

/// Local edits merged into an existing message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatMessagePatch {
    pub text: Option<String>,
    pub response: Option<String>,
    pub kind: Option<MessageKind>,
    pub detected_language: Option<String>,
    pub translated_text: Option<String>,
}

/// History grouped by date string. The per-date payload is kept as returned.
pub type ChatHistory = BTreeMap<String, Value>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_history_record_loads_as_message() {
        let message: ChatMessage = serde_json::from_value(json!({
            "id": 17,
            "query": "What are clinic hours?",
            "answer": "8am to 6pm",
            "created_at": "2024-05-02T09:30:00"
        }))
        .unwrap();

        assert_eq!(message.id, "17");
        assert_eq!(message.text, "What are clinic hours?");
        assert_eq!(message.response, "8am to 6pm");
        assert_eq!(message.kind, MessageKind::Text);
        assert_eq!(message.timestamp.to_rfc3339(), "2024-05-02T09:30:00+00:00");
    }

    #[test]
    fn test_voice_exchange_message() {
        let answer = VoiceChatAnswer {
            original_text: "bonjour".to_string(),
            answer: "hello".to_string(),
            detected_language: Some("fr".to_string()),
            translated_text: Some("hello".to_string()),
            file_size: Some(2048),
        };
        let message = ChatMessage::from_voice_exchange(&answer);
        assert_eq!(message.kind, MessageKind::Voice);
        assert_eq!(message.text, "bonjour");
        assert_eq!(message.file_size, Some(2048));
        assert!(!message.id.is_empty());
    }

    #[test]
    fn test_serialized_kind_uses_type_key() {
        let message = ChatMessage::new(MessageKind::Voice, "a", "b");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "voice");
        assert!(value.get("file_size").is_none());
    }

    #[test]
    fn test_apply_patch() {
        let mut message = ChatMessage::new(MessageKind::Text, "hi", "");
        message.apply(ChatMessagePatch {
            response: Some("hello".to_string()),
            ..Default::default()
        });
        assert_eq!(message.text, "hi");
        assert_eq!(message.response, "hello");
    }
}
