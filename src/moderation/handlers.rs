use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::workflow::ModerationOutcome;
use crate::{
    error::{AppError, ValidationErrors},
    guard::extractor::{AdminArea, RequireRole},
    interactions::{dto::ModerationQueueItem, model::ModeratedField, repo},
    state::AppState,
};

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/moderation", get(list_queue))
        .route("/admin/moderation/:id/:field", post(moderate))
}

#[instrument(skip(state, _guard))]
pub async fn list_queue(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
) -> Result<Json<Vec<ModerationQueueItem>>, AppError> {
    let flagged = repo::list_flagged(state.store.as_ref()).await?;
    Ok(Json(flagged.into_iter().map(ModerationQueueItem::from).collect()))
}

#[instrument(skip(state, guard), fields(admin = %guard.profile.uid))]
pub async fn moderate(
    State(state): State<AppState>,
    guard: RequireRole<AdminArea>,
    Path((id, field)): Path<(String, String)>,
) -> Result<Json<ModerationOutcome>, AppError> {
    let Some(field) = ModeratedField::parse(&field) else {
        let mut errors = ValidationErrors::new();
        errors.add("field", "Field must be input or output.");
        return Err(AppError::ValidationFailed(errors));
    };
    let outcome = state
        .moderation
        .moderate(&id, field, Some(&guard.profile.uid))
        .await?;
    Ok(Json(outcome))
}
