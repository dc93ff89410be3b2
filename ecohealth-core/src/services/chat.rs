use reqwest::multipart::Form;
use serde_json::Value;
use tracing::debug;

use crate::error::PortalResult;
use crate::http::{Binding, EndpointCategory};
use crate::models::{ChatAnswer, ChatHistory, ChatMessage, ChatQuery, VoiceChatAnswer};
use crate::recording::VoiceClip;

const CHAT: EndpointCategory = EndpointCategory::Chat;

/// Chatbot endpoints on the chat backend.
#[derive(Debug, Clone)]
pub struct ChatService {
    binding: Binding,
}

impl ChatService {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub async fn send_message(&self, query: &ChatQuery) -> PortalResult<ChatAnswer> {
        debug!(
            source = %query.source_language,
            target = %query.target_language,
            "Sending chat message"
        );
        self.binding
            .post_json(CHAT, "chat/", query)
            .await
            .map_err(|f| f.normalize("Failed to send message"))
    }

    pub async fn send_voice_message(
        &self,
        clip: VoiceClip,
        target_language: &str,
    ) -> PortalResult<VoiceChatAnswer> {
        debug!(bytes = clip.len(), target = target_language, "Sending voice message");
        let form = Form::new()
            .part("audio_file", clip.into_part()?)
            .text("target_language", target_language.to_string());
        self.binding
            .post_multipart(CHAT, "chat/voice", form)
            .await
            .map_err(|f| f.normalize("Failed to send voice message"))
    }

    pub async fn get_history(&self) -> PortalResult<ChatHistory> {
        self.binding
            .get(CHAT, "chat/history")
            .await
            .map_err(|f| f.normalize("Failed to fetch chat history"))
    }

    pub async fn get_by_date(&self, date: &str) -> PortalResult<Vec<ChatMessage>> {
        self.binding
            .get(CHAT, &format!("chat/history/{}", date))
            .await
            .map_err(|f| f.normalize("Failed to fetch chat messages for date"))
    }

    pub async fn get_by_id(&self, chat_id: &str) -> PortalResult<ChatMessage> {
        self.binding
            .get(CHAT, &format!("chat/history/chat/{}", chat_id))
            .await
            .map_err(|f| f.normalize("Failed to fetch chat message"))
    }

    /// Deletes one day of history, or all of it when `date` is `None`.
    pub async fn delete_history(&self, date: Option<&str>) -> PortalResult<Value> {
        let query: Vec<(&str, &str)> = date.map(|d| vec![("date_str", d)]).unwrap_or_default();
        self.binding
            .delete(CHAT, "chat/history", &query)
            .await
            .map_err(|f| f.normalize("Failed to delete chat history"))
    }

    pub async fn delete_by_id(&self, chat_id: &str) -> PortalResult<Value> {
        self.binding
            .delete(CHAT, &format!("chat/history/{}", chat_id), &[])
            .await
            .map_err(|f| f.normalize("Failed to delete chat message"))
    }

    pub async fn test_audio_upload(&self, clip: VoiceClip) -> PortalResult<Value> {
        let form = Form::new().part("audio_file", clip.into_part()?);
        self.binding
            .post_multipart(CHAT, "chat/voice/test", form)
            .await
            .map_err(|f| f.normalize("Failed to test audio upload"))
    }
}
