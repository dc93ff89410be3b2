use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{PortalError, PortalResult};
use crate::models::{
    ChatAnswer, ChatHistory, ChatMessage, ChatMessagePatch, ChatQuery, VoiceChatAnswer,
};
use crate::recording::VoiceClip;
use crate::services::ChatService;

#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub history: ChatHistory,
    pub current_chat: Option<ChatMessage>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_sending: bool,
    pub is_fetching: bool,
    pub is_deleting: bool,
    pub is_recording: bool,
    /// Recorded clip waiting to be sent.
    pub pending_audio: Option<VoiceClip>,
}

#[derive(Debug, Clone, Copy)]
enum Flag {
    Loading,
    Sending,
    Fetching,
    Deleting,
}

impl ChatState {
    fn flag(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::Loading => &mut self.loading,
            Flag::Sending => &mut self.is_sending,
            Flag::Fetching => &mut self.is_fetching,
            Flag::Deleting => &mut self.is_deleting,
        }
    }
}

pub struct ChatStore {
    service: ChatService,
    state: RwLock<ChatState>,
}

impl ChatStore {
    pub fn new(service: ChatService) -> Self {
        Self {
            service,
            state: RwLock::new(ChatState::default()),
        }
    }

    pub async fn snapshot(&self) -> ChatState {
        self.state.read().await.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.read().await.messages.clone()
    }

    async fn begin(&self, flag: Flag) {
        let mut state = self.state.write().await;
        *state.flag(flag) = true;
        state.error = None;
    }

    /// Clears the pending flag, then either applies the result or records the
    /// error message.
    async fn finish<T>(
        &self,
        flag: Flag,
        result: PortalResult<T>,
        on_success: impl FnOnce(&mut ChatState, &T),
    ) -> PortalResult<T> {
        let mut state = self.state.write().await;
        *state.flag(flag) = false;
        match &result {
            Ok(value) => {
                on_success(&mut *state, value);
                state.error = None;
            }
            Err(e) => {
                debug!("Chat action failed: {}", e);
                state.error = Some(e.message());
            }
        }
        result
    }

    pub async fn send_message(&self, query: ChatQuery) -> PortalResult<ChatAnswer> {
        self.begin(Flag::Sending).await;
        let result = self.service.send_message(&query).await;
        self.finish(Flag::Sending, result, |state, answer| {
            state
                .messages
                .push(ChatMessage::from_text_exchange(&query, answer));
        })
        .await
    }

    pub async fn send_voice_message(
        &self,
        clip: VoiceClip,
        target_language: &str,
    ) -> PortalResult<VoiceChatAnswer> {
        self.begin(Flag::Sending).await;
        let result = self.service.send_voice_message(clip, target_language).await;
        self.finish(Flag::Sending, result, |state, answer| {
            state.messages.push(ChatMessage::from_voice_exchange(answer));
            state.pending_audio = None;
        })
        .await
    }

    /// Sends the clip set with [`ChatStore::set_pending_audio`].
    pub async fn send_pending_audio(&self, target_language: &str) -> PortalResult<VoiceChatAnswer> {
        let clip = self.state.read().await.pending_audio.clone();
        match clip {
            Some(clip) => self.send_voice_message(clip, target_language).await,
            None => Err(PortalError::Recording("No recorded audio to send".to_string())),
        }
    }

    pub async fn fetch_history(&self) -> PortalResult<ChatHistory> {
        self.begin(Flag::Fetching).await;
        let result = self.service.get_history().await;
        self.finish(Flag::Fetching, result, |state, history| {
            state.history = history.clone();
        })
        .await
    }

    /// Replaces the visible messages with that day's conversation.
    pub async fn fetch_by_date(&self, date: &str) -> PortalResult<Vec<ChatMessage>> {
        self.begin(Flag::Fetching).await;
        let result = self.service.get_by_date(date).await;
        self.finish(Flag::Fetching, result, |state, messages| {
            state.messages = messages.clone();
        })
        .await
    }

    pub async fn fetch_by_id(&self, chat_id: &str) -> PortalResult<ChatMessage> {
        self.begin(Flag::Loading).await;
        let result = self.service.get_by_id(chat_id).await;
        self.finish(Flag::Loading, result, |state, chat| {
            state.current_chat = Some(chat.clone());
        })
        .await
    }

    /// Deletes one day of history, or everything (including the visible
    /// messages) when `date` is `None`.
    pub async fn delete_history(&self, date: Option<&str>) -> PortalResult<Value> {
        self.begin(Flag::Deleting).await;
        let result = self.service.delete_history(date).await;
        self.finish(Flag::Deleting, result, |state, _| match date {
            Some(date) => {
                state.history.remove(date);
            }
            None => {
                state.history.clear();
                state.messages.clear();
            }
        })
        .await
    }

    pub async fn delete_by_id(&self, chat_id: &str) -> PortalResult<Value> {
        self.begin(Flag::Deleting).await;
        let result = self.service.delete_by_id(chat_id).await;
        self.finish(Flag::Deleting, result, |state, _| {
            state.messages.retain(|m| m.id != chat_id);
        })
        .await
    }

    pub async fn test_audio_upload(&self, clip: VoiceClip) -> PortalResult<Value> {
        self.begin(Flag::Loading).await;
        let result = self.service.test_audio_upload(clip).await;
        self.finish(Flag::Loading, result, |_, _| {}).await
    }

    pub async fn set_recording(&self, recording: bool) {
        self.state.write().await.is_recording = recording;
    }

    pub async fn set_pending_audio(&self, clip: Option<VoiceClip>) {
        self.state.write().await.pending_audio = clip;
    }

    pub async fn clear_messages(&self) {
        self.state.write().await.messages.clear();
    }

    pub async fn clear_current_chat(&self) {
        self.state.write().await.current_chat = None;
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn add_message(&self, message: ChatMessage) {
        self.state.write().await.messages.push(message);
    }

    /// Returns whether a message with that id existed.
    pub async fn update_message(&self, message_id: &str, patch: ChatMessagePatch) -> bool {
        let mut state = self.state.write().await;
        match state.messages.iter_mut().find(|m| m.id == message_id) {
            Some(message) => {
                message.apply(patch);
                true
            }
            None => false,
        }
    }

    pub async fn remove_message(&self, message_id: &str) {
        self.state.write().await.messages.retain(|m| m.id != message_id);
    }
}
