use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use super::dto::{FeedbackRequest, RecordInteractionRequest};
use super::model::Interaction;
use super::services;
use crate::{
    error::AppError,
    guard::extractor::{ClientArea, RequireRole},
    state::AppState,
};

pub fn interaction_routes() -> Router<AppState> {
    Router::new()
        .route("/interactions", get(list_interactions).post(record_interaction))
        .route("/interactions/:id/feedback", post(leave_feedback))
        .route("/interactions/:id/flag", post(flag_interaction))
}

#[instrument(skip(state, guard), fields(uid = %guard.profile.uid))]
pub async fn list_interactions(
    State(state): State<AppState>,
    guard: RequireRole<ClientArea>,
) -> Result<Json<Vec<Interaction>>, AppError> {
    let items = services::list_mine(state.store.as_ref(), &guard.profile.uid).await?;
    Ok(Json(items))
}

#[instrument(skip(state, guard, payload), fields(uid = %guard.profile.uid))]
pub async fn record_interaction(
    State(state): State<AppState>,
    guard: RequireRole<ClientArea>,
    Json(payload): Json<RecordInteractionRequest>,
) -> Result<(StatusCode, Json<Interaction>), AppError> {
    let interaction = services::record(state.store.as_ref(), &guard.profile.uid, payload).await?;
    Ok((StatusCode::CREATED, Json(interaction)))
}

#[instrument(skip(state, guard, payload), fields(uid = %guard.profile.uid))]
pub async fn leave_feedback(
    State(state): State<AppState>,
    guard: RequireRole<ClientArea>,
    Path(id): Path<String>,
    Json(payload): Json<FeedbackRequest>,
) -> Result<Json<Interaction>, AppError> {
    let feedback = payload.validate()?;
    let interaction =
        services::leave_feedback(state.store.as_ref(), &guard.profile.uid, &id, feedback).await?;
    Ok(Json(interaction))
}

#[instrument(skip(state, guard), fields(uid = %guard.profile.uid))]
pub async fn flag_interaction(
    State(state): State<AppState>,
    guard: RequireRole<ClientArea>,
    Path(id): Path<String>,
) -> Result<Json<Interaction>, AppError> {
    let interaction = services::flag(state.store.as_ref(), &guard.profile.uid, &id).await?;
    Ok(Json(interaction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{dto::AgentForm, model::AgentStatus, services as agent_services};
    use crate::app::build_app;
    use crate::auth::identity::testing::identity;
    use crate::auth::{Identity, JwtKeys};
    use crate::profiles::repo as profile_repo;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::Request,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        state: &AppState,
        method: &str,
        uri: &str,
        who: &Identity,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = JwtKeys::from_ref(state).sign_access(who).unwrap();
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn client(state: &AppState, uid: &str) -> Identity {
        let who = identity(uid, None);
        state.profiles.resolve(&who).await;
        profile_repo::mark_onboarded(state.store.as_ref(), uid, None, None)
            .await
            .unwrap();
        who
    }

    async fn published_agent(state: &AppState) -> String {
        let mut draft = AgentForm {
            name: "Marketing Maven".into(),
            description: "Generates social media posts.".into(),
            category: "Marketing".into(),
            prompt_base: "You are a marketing content generator.".into(),
            ..AgentForm::default()
        }
        .validate()
        .unwrap();
        draft.status = AgentStatus::Published;
        agent_services::create(state.store.as_ref(), draft)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn record_feedback_and_flag() {
        let state = AppState::fake();
        let who = client(&state, "c1").await;
        let agent_id = published_agent(&state).await;

        let (status, created) = send(
            &state,
            "POST",
            "/api/v1/interactions",
            &who,
            Some(json!({
                "agentId": agent_id,
                "inputType": "form",
                "inputContent": { "topic": "launch", "tone": "playful" },
                "outputContent": "Three posts about the launch."
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/v1/interactions/{id}/feedback"),
            &who,
            Some(json!({ "rating": 4, "comment": "Nice" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feedback"]["rating"], 4);

        let (status, body) = send(
            &state,
            "POST",
            &format!("/api/v1/interactions/{id}/flag"),
            &who,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["isFlaggedForModeration"], true);

        let (_, listed) = send(&state, "GET", "/api/v1/interactions", &who, None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn other_users_interactions_are_invisible() {
        let state = AppState::fake();
        let owner = client(&state, "c1").await;
        let stranger = client(&state, "c2").await;
        let agent_id = published_agent(&state).await;

        let (_, created) = send(
            &state,
            "POST",
            "/api/v1/interactions",
            &owner,
            Some(json!({
                "agentId": agent_id,
                "inputType": "chat",
                "inputContent": "hello",
                "outputContent": "hi"
            })),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let (status, _) = send(
            &state,
            "POST",
            &format!("/api/v1/interactions/{id}/flag"),
            &stranger,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unknown_agent_is_rejected() {
        let state = AppState::fake();
        let who = client(&state, "c1").await;
        let (status, _) = send(
            &state,
            "POST",
            "/api/v1/interactions",
            &who,
            Some(json!({
                "agentId": "nope",
                "inputType": "chat",
                "inputContent": "hello"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
