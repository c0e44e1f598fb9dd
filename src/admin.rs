//! Admin dashboard routes.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tracing::instrument;

use crate::{
    agents::{self, model::AgentStatus},
    error::AppError,
    guard::extractor::{AdminArea, RequireRole},
    interactions::{self, model::ReviewStatus},
    moderation,
    profiles::{self, model::Role},
    state::AppState,
};

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCounts {
    pub total: usize,
    pub published: usize,
    pub draft: usize,
    pub archived: usize,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCounts {
    pub total: usize,
    pub admins: usize,
    pub pending_onboarding: usize,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationCounts {
    pub flagged: usize,
    pub pending_review: usize,
}

#[derive(Debug, Default, Serialize)]
pub struct Overview {
    pub agents: AgentCounts,
    pub users: UserCounts,
    pub moderation: ModerationCounts,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/overview", get(overview))
        .merge(agents::handlers::admin_routes())
        .merge(profiles::handlers::admin_routes())
        .merge(moderation::router())
}

#[instrument(skip(state, _guard))]
pub async fn overview(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
) -> Result<Json<Overview>, AppError> {
    let store = state.store.as_ref();
    let mut out = Overview::default();

    for agent in agents::repo::list(store, None).await? {
        out.agents.total += 1;
        match agent.status {
            AgentStatus::Published => out.agents.published += 1,
            AgentStatus::Draft => out.agents.draft += 1,
            AgentStatus::Archived => out.agents.archived += 1,
        }
    }

    for user in profiles::repo::list(store).await? {
        out.users.total += 1;
        if user.role == Role::Admin {
            out.users.admins += 1;
        }
        if !user.onboarding_completed {
            out.users.pending_onboarding += 1;
        }
    }

    let flagged = interactions::repo::list_flagged(store).await?;
    out.moderation.flagged = flagged.len();
    out.moderation.pending_review = flagged
        .iter()
        .filter(|i| i.review_status() == ReviewStatus::PendingReview)
        .count();

    Ok(Json(out))
}
