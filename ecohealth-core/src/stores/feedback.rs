use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::PortalResult;
use crate::models::{FeedbackDraft, FeedbackRecord};
use crate::services::FeedbackService;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeedbackState {
    /// The last record submitted or resent.
    pub feedback: Option<FeedbackRecord>,
    pub feedbacks: Vec<FeedbackRecord>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_submitting: bool,
    pub is_fetching: bool,
    pub is_resending: bool,
}

pub struct FeedbackStore {
    service: FeedbackService,
    state: RwLock<FeedbackState>,
}

impl FeedbackStore {
    pub fn new(service: FeedbackService) -> Self {
        Self {
            service,
            state: RwLock::new(FeedbackState::default()),
        }
    }

    pub async fn snapshot(&self) -> FeedbackState {
        self.state.read().await.clone()
    }

    /// Validates the draft before anything is sent. A draft that fails
    /// validation leaves the store untouched.
    pub async fn submit(&self, draft: FeedbackDraft) -> PortalResult<FeedbackRecord> {
        draft.validate()?;

        {
            let mut state = self.state.write().await;
            state.is_submitting = true;
            state.error = None;
        }

        let result = self.service.create(draft).await;

        let mut state = self.state.write().await;
        state.is_submitting = false;
        match &result {
            Ok(record) => {
                info!(feedback_id = %record.id, "Feedback submitted");
                state.feedback = Some(record.clone());
                state.error = None;
            }
            Err(e) => state.error = Some(e.message()),
        }
        result
    }

    pub async fn fetch_mine(&self) -> PortalResult<Vec<FeedbackRecord>> {
        {
            let mut state = self.state.write().await;
            state.is_fetching = true;
            state.error = None;
        }

        let result = self.service.list_mine().await;

        let mut state = self.state.write().await;
        state.is_fetching = false;
        match &result {
            Ok(records) => {
                state.feedbacks = records.clone();
                state.error = None;
            }
            Err(e) => state.error = Some(e.message()),
        }
        result
    }

    /// The new record goes to the front of the list.
    pub async fn resend(&self, feedback_id: &str) -> PortalResult<FeedbackRecord> {
        {
            let mut state = self.state.write().await;
            state.is_resending = true;
            state.error = None;
        }

        let result = self.service.resend(feedback_id).await;

        let mut state = self.state.write().await;
        state.is_resending = false;
        match &result {
            Ok(record) => {
                debug!(original = feedback_id, feedback_id = %record.id, "Feedback resent");
                state.feedbacks.insert(0, record.clone());
                state.feedback = Some(record.clone());
                state.error = None;
            }
            Err(e) => state.error = Some(e.message()),
        }
        result
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn clear_feedback(&self) {
        let mut state = self.state.write().await;
        state.feedback = None;
        state.error = None;
    }

    pub async fn clear_feedbacks(&self) {
        let mut state = self.state.write().await;
        state.feedbacks.clear();
        state.error = None;
    }
}
