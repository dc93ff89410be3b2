use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{lenient_timestamp, string_or_number};
use crate::error::PortalResult;
use crate::forms;
use crate::recording::VoiceClip;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub star_rating: Option<u8>,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub voice_message: Option<String>,
    #[serde(default)]
    pub voice_text: Option<String>,
    #[serde(default)]
    pub voice_message_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

impl FeedbackRecord {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_voice(&self) -> bool {
        self.voice_message_url.as_deref().is_some_and(|v| !v.is_empty())
            || self.voice_text.as_deref().is_some_and(|v| !v.is_empty())
    }

    pub fn has_emoji(&self) -> bool {
        self.emoji.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn rating(&self) -> u8 {
        self.star_rating.unwrap_or(0)
    }
}

/// A feedback submission being composed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackDraft {
    pub text: Option<String>,
    pub star_rating: Option<u8>,
    pub emoji: Option<String>,
    pub voice_message: Option<VoiceClip>,
}

impl FeedbackDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn rating(mut self, stars: u8) -> Self {
        self.star_rating = Some(stars);
        self
    }

    pub fn emoji(mut self, emoji: impl Into<String>) -> Self {
        self.emoji = Some(emoji.into());
        self
    }

    pub fn voice(mut self, clip: VoiceClip) -> Self {
        self.voice_message = Some(clip);
        self
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_rating(&self) -> bool {
        self.star_rating.is_some_and(|r| r > 0)
    }

    pub fn has_emoji(&self) -> bool {
        self.emoji.as_deref().is_some_and(|e| !e.is_empty())
    }

    pub fn has_voice(&self) -> bool {
        self.voice_message.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_content(&self) -> bool {
        self.has_text() || self.has_rating() || self.has_emoji() || self.has_voice()
    }

    pub fn validate(&self) -> PortalResult<()> {
        forms::validate_feedback(self)
    }

    /// Multipart body carrying only the fields that are present.
    pub fn into_form(self) -> PortalResult<Form> {
        let mut form = Form::new();
        let mut fields = 0usize;

        if let Some(emoji) = self.emoji.filter(|e| !e.is_empty()) {
            form = form.text("emoji", emoji);
            fields += 1;
        }
        if let Some(stars) = self.star_rating.filter(|r| *r > 0) {
            form = form.text("star_rating", stars.to_string());
            fields += 1;
        }
        if let Some(text) = self.text.filter(|t| !t.trim().is_empty()) {
            form = form.text("text", text);
            fields += 1;
        }
        if let Some(clip) = self.voice_message.filter(|c| !c.is_empty()) {
            let part: Part = clip.into_part()?;
            form = form.part("voice_message", part);
            fields += 1;
        }

        tracing::debug!(fields, "Built feedback form");
        Ok(form)
    }
}
