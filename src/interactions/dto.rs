use serde::{Deserialize, Serialize};

use super::model::{Feedback, InputContent, Interaction, ReviewStatus};
use crate::agents::model::InterfaceType;
use crate::error::{AppError, ValidationErrors};

pub const MAX_COMMENT_CHARS: usize = 1000;

/// Body of `POST /interactions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordInteractionRequest {
    pub agent_id: String,
    pub input_type: InterfaceType,
    pub input_content: InputContent,
    #[serde(default)]
    pub output_content: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl RecordInteractionRequest {
    pub fn validate(self) -> Result<Self, AppError> {
        let mut errors = ValidationErrors::new();
        if self.agent_id.trim().is_empty() {
            errors.add("agentId", "Agent is required.");
        }
        let empty_input = match &self.input_content {
            InputContent::Text(s) => s.trim().is_empty(),
            InputContent::Structured(m) => m.is_empty(),
        };
        if empty_input {
            errors.add("inputContent", "Input must not be empty.");
        }
        errors.into_result()?;
        Ok(self)
    }
}

/// Body of `POST /interactions/:id/feedback`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FeedbackRequest {
    pub fn validate(self) -> Result<Feedback, AppError> {
        let mut errors = ValidationErrors::new();
        let rating = match self.rating {
            None => None,
            Some(r) if (1..=5).contains(&r) => Some(r as u8),
            Some(_) => {
                errors.add("rating", "Rating must be between 1 and 5.");
                None
            }
        };
        let comment = self
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if comment
            .as_ref()
            .map_or(false, |c| c.chars().count() > MAX_COMMENT_CHARS)
        {
            errors.add(
                "comment",
                format!("Comment must be at most {MAX_COMMENT_CHARS} characters."),
            );
        }
        if self.rating.is_none() && comment.is_none() {
            errors.add("body", "Give a rating or a comment.");
        }
        errors.into_result()?;
        Ok(Feedback { rating, comment })
    }
}

/// Row of the moderation queue.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationQueueItem {
    #[serde(flatten)]
    pub interaction: Interaction,
    pub review_status: ReviewStatus,
}

impl From<Interaction> for ModerationQueueItem {
    fn from(interaction: Interaction) -> Self {
        let review_status = interaction.review_status();
        Self {
            interaction,
            review_status,
        }
    }
}
