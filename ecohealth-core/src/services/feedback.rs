use tracing::debug;

use crate::error::PortalResult;
use crate::http::{Binding, EndpointCategory};
use crate::models::{FeedbackDraft, FeedbackRecord, MaybeEnveloped};

const FEEDBACK: EndpointCategory = EndpointCategory::Feedback;

#[derive(Debug, Clone)]
pub struct FeedbackService {
    binding: Binding,
}

impl FeedbackService {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    /// Posts the draft as multipart, sending only the fields it carries.
    pub async fn create(&self, draft: FeedbackDraft) -> PortalResult<FeedbackRecord> {
        let form = draft.into_form()?;
        let record: MaybeEnveloped<FeedbackRecord> = self
            .binding
            .post_multipart(FEEDBACK, "/", form)
            .await
            .map_err(|f| f.normalize("Failed to submit feedback"))?;
        Ok(record.into_inner())
    }

    pub async fn list_mine(&self) -> PortalResult<Vec<FeedbackRecord>> {
        let records: MaybeEnveloped<Vec<FeedbackRecord>> = self
            .binding
            .get(FEEDBACK, "me")
            .await
            .map_err(|f| f.normalize("Failed to fetch feedbacks"))?;
        let records = records.into_inner();
        debug!(count = records.len(), "Fetched own feedback");
        Ok(records)
    }

    /// Submits a copy of an earlier feedback and returns the new record.
    pub async fn resend(&self, feedback_id: &str) -> PortalResult<FeedbackRecord> {
        let record: MaybeEnveloped<FeedbackRecord> = self
            .binding
            .post(FEEDBACK, &format!("{}/resend", feedback_id))
            .await
            .map_err(|f| f.normalize("Failed to resend feedback"))?;
        Ok(record.into_inner())
    }
}
