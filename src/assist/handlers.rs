use axum::{extract::State, routing::post, Json, Router};
use tracing::instrument;

use super::flows::{
    self, FeedbackAnalysis, FeedbackAnalysisInput, OnboardingAssistance,
    OnboardingAssistanceInput,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    guard::extractor::{AdminArea, RequireRole},
    state::AppState,
};

pub fn assist_routes() -> Router<AppState> {
    Router::new()
        .route("/onboarding/assist", post(onboarding_assist))
        .route("/admin/feedback/analyze", post(analyze_feedback))
}

/// Signed-in callers only; used while onboarding is still incomplete.
#[instrument(skip(state, identity, payload), fields(uid = %identity.uid))]
pub async fn onboarding_assist(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(payload): Json<OnboardingAssistanceInput>,
) -> Result<Json<OnboardingAssistance>, AppError> {
    let out = flows::onboarding_assistance(state.generator.as_ref(), payload).await?;
    Ok(Json(out))
}

#[instrument(skip(state, _guard, payload))]
pub async fn analyze_feedback(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
    Json(payload): Json<FeedbackAnalysisInput>,
) -> Result<Json<FeedbackAnalysis>, AppError> {
    let out = flows::analyze_feedback(state.generator.as_ref(), payload).await?;
    Ok(Json(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::assist::generator::testing::CannedGenerator;
    use crate::auth::identity::testing::identity;
    use crate::auth::JwtKeys;
    use crate::profiles::model::Role;
    use axum::{
        body::{to_bytes, Body},
        extract::FromRef,
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    async fn post(state: &AppState, uri: &str, who: &crate::auth::Identity, body: Value) -> (StatusCode, Value) {
        let token = JwtKeys::from_ref(state).sign_access(who).unwrap();
        let req = Request::post(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let res = build_app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn assist_works_before_onboarding_is_complete() {
        let state = AppState::fake().with_generator(Arc::new(CannedGenerator::ok(json!({
            "onboardingMessage": "Welcome!",
            "suggestedActions": ["Open the catalog"]
        }))));
        let (status, body) = post(
            &state,
            "/api/v1/onboarding/assist",
            &identity("new-user", None),
            json!({ "userGoal": "Automate invoices", "experienceLevel": "beginner" }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["onboardingMessage"], "Welcome!");
    }

    #[tokio::test]
    async fn unconfigured_generator_is_bad_gateway() {
        let state = AppState::fake();
        let mut admin = identity("admin-1", None);
        admin.role_claim = Some(Role::Admin);
        let (status, _) = post(
            &state,
            "/api/v1/admin/feedback/analyze",
            &admin,
            json!({ "feedbackText": "Too expensive." }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }
}
