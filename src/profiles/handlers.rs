use axum::{
    extract::{Path, State},
    routing::{get, patch, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::{AdminUserPatch, OnboardingRequest, UserListItem};
use super::model::UserProfile;
use super::services;
use crate::{
    auth::AuthUser,
    error::AppError,
    guard::extractor::{AdminArea, ClientArea, RequireRole},
    state::AppState,
};

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me))
        .route("/onboarding", post(complete_onboarding))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", get(list_users))
        .route("/admin/users/:uid", patch(update_user))
}

/// Resolved profile of the caller. Not onboarding-guarded.
#[instrument(skip(state, identity), fields(uid = %identity.uid))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Json<UserProfile> {
    Json(state.profiles.resolve(&identity).await)
}

#[instrument(skip(state, guard, payload), fields(uid = %guard.profile.uid))]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    guard: RequireRole<ClientArea>,
    Json(payload): Json<OnboardingRequest>,
) -> Result<Json<UserProfile>, AppError> {
    let form = payload.validate()?;
    let profile =
        services::complete_onboarding(state.store.as_ref(), &guard.profile.uid, form).await?;
    Ok(Json(profile))
}

#[instrument(skip(state, _guard))]
pub async fn list_users(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
) -> Result<Json<Vec<UserListItem>>, AppError> {
    let users = services::list_users(state.store.as_ref()).await?;
    Ok(Json(users.into_iter().map(UserListItem::from).collect()))
}

#[instrument(skip(state, guard, payload), fields(admin = %guard.profile.uid))]
pub async fn update_user(
    State(state): State<AppState>,
    guard: RequireRole<AdminArea>,
    Path(uid): Path<String>,
    Json(payload): Json<AdminUserPatch>,
) -> Result<Json<UserProfile>, AppError> {
    let edit = payload.validate()?;
    let profile = services::admin_update(state.store.as_ref(), &uid, &edit).await?;
    info!(target_uid = %uid, role = profile.role.as_str(), "user updated");
    Ok(Json(profile))
}
