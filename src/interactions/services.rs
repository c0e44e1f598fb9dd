use tracing::{info, instrument};

use super::dto::RecordInteractionRequest;
use super::model::{Feedback, Interaction};
use super::repo::{self, NewInteraction};
use crate::agents::services as agents;
use crate::error::AppError;
use crate::store::DocumentStore;

/// Interaction owned by `user_id`; others' records read as missing.
async fn owned(store: &dyn DocumentStore, user_id: &str, id: &str) -> Result<Interaction, AppError> {
    repo::get(store, id)
        .await?
        .filter(|i| i.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("interaction {id}")))
}

#[instrument(skip(store, request), fields(agent_id = %request.agent_id))]
pub async fn record(
    store: &dyn DocumentStore,
    user_id: &str,
    request: RecordInteractionRequest,
) -> Result<Interaction, AppError> {
    let request = request.validate()?;
    agents::published(store, &request.agent_id).await?;
    let interaction = repo::create(
        store,
        NewInteraction {
            user_id: user_id.to_string(),
            agent_id: request.agent_id,
            input_type: request.input_type,
            input_content: request.input_content,
            output_content: request.output_content,
            session_id: request.session_id,
        },
    )
    .await?;
    info!(interaction_id = %interaction.id, "interaction recorded");
    Ok(interaction)
}

pub async fn list_mine(store: &dyn DocumentStore, user_id: &str) -> Result<Vec<Interaction>, AppError> {
    Ok(repo::list_for_user(store, user_id).await?)
}

#[instrument(skip(store, feedback))]
pub async fn leave_feedback(
    store: &dyn DocumentStore,
    user_id: &str,
    id: &str,
    feedback: Feedback,
) -> Result<Interaction, AppError> {
    let mut interaction = owned(store, user_id, id).await?;
    repo::set_feedback(store, id, &feedback).await?;
    info!(interaction_id = %id, rating = ?feedback.rating, "feedback saved");
    interaction.feedback = Some(feedback);
    Ok(interaction)
}

#[instrument(skip(store))]
pub async fn flag(store: &dyn DocumentStore, user_id: &str, id: &str) -> Result<Interaction, AppError> {
    let mut interaction = owned(store, user_id, id).await?;
    repo::flag(store, id).await?;
    info!(interaction_id = %id, "interaction flagged for moderation");
    interaction.is_flagged_for_moderation = Some(true);
    Ok(interaction)
}
