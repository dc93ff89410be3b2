//! Browsing past feedback: classification, date buckets, filters and sorting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::PortalError;
use crate::models::FeedbackRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackKind {
    TextVoice,
    Text,
    Voice,
    EmojiRating,
    Emoji,
    Rating,
    Other,
}

impl FeedbackKind {
    pub fn classify(record: &FeedbackRecord) -> Self {
        let text = record.has_text();
        let voice = record.has_voice();
        let emoji = record.has_emoji();
        let rating = record.rating() > 0;

        match (text, voice, emoji, rating) {
            (true, true, _, _) => FeedbackKind::TextVoice,
            (true, false, _, _) => FeedbackKind::Text,
            (false, true, _, _) => FeedbackKind::Voice,
            (false, false, true, true) => FeedbackKind::EmojiRating,
            (false, false, true, false) => FeedbackKind::Emoji,
            (false, false, false, true) => FeedbackKind::Rating,
            _ => FeedbackKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::TextVoice => "text-voice",
            FeedbackKind::Text => "text",
            FeedbackKind::Voice => "voice",
            FeedbackKind::EmojiRating => "emoji-rating",
            FeedbackKind::Emoji => "emoji",
            FeedbackKind::Rating => "rating",
            FeedbackKind::Other => "other",
        }
    }

    /// Broad kinds also match records that merely contain that medium, so
    /// filtering by `text` includes `text-voice` records.
    pub fn matches(&self, record: &FeedbackRecord) -> bool {
        if FeedbackKind::classify(record) == *self {
            return true;
        }
        match self {
            FeedbackKind::Text => record.text.as_deref().is_some_and(|t| !t.is_empty()),
            FeedbackKind::Voice => record.has_voice(),
            FeedbackKind::Emoji => record.has_emoji(),
            _ => false,
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text-voice" => Ok(FeedbackKind::TextVoice),
            "text" => Ok(FeedbackKind::Text),
            "voice" => Ok(FeedbackKind::Voice),
            "emoji-rating" => Ok(FeedbackKind::EmojiRating),
            "emoji" => Ok(FeedbackKind::Emoji),
            "rating" => Ok(FeedbackKind::Rating),
            "other" => Ok(FeedbackKind::Other),
            other => Err(PortalError::validation(
                "type",
                format!("Unknown feedback type '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBucket {
    Recent,
    Week,
    Month,
    Older,
}

impl DateBucket {
    /// Bucket by whole days elapsed, rounded up. Future dates count the same
    /// as past ones.
    pub fn of(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let millis = (now - created_at).num_milliseconds().unsigned_abs();
        let day = 86_400_000u64;
        let days = millis.div_ceil(day);
        match days {
            0..=1 => DateBucket::Recent,
            2..=7 => DateBucket::Week,
            8..=30 => DateBucket::Month,
            _ => DateBucket::Older,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateBucket::Recent => "recent",
            DateBucket::Week => "week",
            DateBucket::Month => "month",
            DateBucket::Older => "older",
        }
    }
}

impl fmt::Display for DateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DateBucket {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "recent" => Ok(DateBucket::Recent),
            "week" => Ok(DateBucket::Week),
            "month" => Ok(DateBucket::Month),
            "older" => Ok(DateBucket::Older),
            other => Err(PortalError::validation(
                "date_range",
                format!("Unknown date range '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSort {
    #[default]
    Newest,
    Oldest,
    Highest,
    Lowest,
}

impl FromStr for FeedbackSort {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" => Ok(FeedbackSort::Newest),
            "oldest" => Ok(FeedbackSort::Oldest),
            "highest" => Ok(FeedbackSort::Highest),
            "lowest" => Ok(FeedbackSort::Lowest),
            other => Err(PortalError::validation(
                "sort",
                format!("Unknown sort order '{}'", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackFilter {
    pub search: Option<String>,
    pub rating: Option<u8>,
    pub kind: Option<FeedbackKind>,
    pub date_range: Option<DateBucket>,
    pub sort: FeedbackSort,
}

impl FeedbackFilter {
    pub fn is_active(&self) -> bool {
        self.search.as_deref().is_some_and(|s| !s.is_empty())
            || self.rating.is_some()
            || self.kind.is_some()
            || self.date_range.is_some()
    }

    pub fn matches(&self, record: &FeedbackRecord, now: DateTime<Utc>) -> bool {
        let search_match = match self.search.as_deref().map(str::to_lowercase) {
            Some(term) if !term.is_empty() => [record.text.as_deref(), record.voice_text.as_deref()]
                .into_iter()
                .flatten()
                .any(|t| t.to_lowercase().contains(&term)),
            _ => true,
        };

        let rating_match = self
            .rating
            .map_or(true, |stars| record.star_rating == Some(stars));

        let kind_match = self.kind.map_or(true, |kind| kind.matches(record));

        let date_match = self.date_range.map_or(true, |bucket| {
            record
                .created_at
                .is_some_and(|created| DateBucket::of(created, now) == bucket)
        });

        search_match && rating_match && kind_match && date_match
    }

    pub fn apply<'a>(&self, records: &'a [FeedbackRecord], now: DateTime<Utc>) -> Vec<&'a FeedbackRecord> {
        let mut selected: Vec<&FeedbackRecord> =
            records.iter().filter(|r| self.matches(r, now)).collect();
        selected.sort_by(|a, b| self.compare(a, b));
        selected
    }

    fn compare(&self, a: &FeedbackRecord, b: &FeedbackRecord) -> Ordering {
        match self.sort {
            FeedbackSort::Newest => b.created_at.cmp(&a.created_at),
            FeedbackSort::Oldest => a.created_at.cmp(&b.created_at),
            FeedbackSort::Highest => b.rating().cmp(&a.rating()),
            FeedbackSort::Lowest => a.rating().cmp(&b.rating()),
        }
    }
}
