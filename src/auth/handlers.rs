use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{AuthResponse, LoginRequest, PublicUser, RefreshRequest, RegisterRequest};
use super::jwt::JwtKeys;
use super::password::hash_password;
use super::repo::Account;
use crate::{error::AppError, profiles::repo as profile_repo, state::AppState};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, account: &Account) -> Result<AuthResponse, AppError> {
    let keys = JwtKeys::from_ref(state);
    let identity = account.identity(&state.config.admin);
    Ok(AuthResponse {
        access_token: keys.sign_access(&identity)?,
        refresh_token: keys.sign_refresh(&identity)?,
        user: PublicUser::from(account),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let payload = payload.validate()?;

    if Account::find_by_email(state.store.as_ref(), &payload.email)
        .await?
        .is_some()
    {
        warn!(email = %payload.email, "email already registered");
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = hash_password(&payload.password)?;
    let account = Account::create(
        state.store.as_ref(),
        &payload.email,
        &hash,
        payload.display_name,
    )
    .await?;

    // first sight of this identity creates its profile
    state
        .profiles
        .resolve(&account.identity(&state.config.admin))
        .await;

    info!(uid = %account.id, email = %account.email, "account registered");
    Ok((StatusCode::CREATED, Json(issue_tokens(&state, &account)?)))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let account =
        Account::authenticate(state.store.as_ref(), &payload.email, &payload.password).await?;

    let profile = state
        .profiles
        .resolve(&account.identity(&state.config.admin))
        .await;
    if let Err(e) = profile_repo::touch_last_login(state.store.as_ref(), &profile.uid).await {
        warn!(error = %e, uid = %profile.uid, "could not record last login");
    }

    info!(uid = %account.id, email = %account.email, "user logged in");
    Ok(Json(issue_tokens(&state, &account)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    // reload so email and role changes take effect on the new pair
    let account = Account::find_by_id(state.store.as_ref(), &claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    Ok(Json(issue_tokens(&state, &account)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use axum::{
        body::{to_bytes, Body},
        http::Request,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn post_json(app: axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let res = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn register_login_and_refresh() {
        let app = build_app(AppState::fake());
        let creds = json!({ "email": "Client@Example.com", "password": "long-enough-pw" });

        let (status, body) = post_json(app.clone(), "/api/v1/auth/register", creds.clone()).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "client@example.com");

        let (status, _) = post_json(app.clone(), "/api/v1/auth/register", creds.clone()).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = post_json(app.clone(), "/api/v1/auth/login", creds).await;
        assert_eq!(status, StatusCode::OK);
        let refresh_token = body["refresh_token"].as_str().unwrap().to_string();

        let (status, body) = post_json(
            app.clone(),
            "/api/v1/auth/refresh",
            json!({ "refresh_token": refresh_token }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["access_token"].is_string());
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_unauthorized() {
        let app = build_app(AppState::fake());
        let creds = json!({ "email": "a@example.com", "password": "long-enough-pw" });
        post_json(app.clone(), "/api/v1/auth/register", creds).await;

        let (status, body) = post_json(
            app,
            "/api/v1/auth/login",
            json!({ "email": "a@example.com", "password": "wrong-password" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn register_reports_field_errors() {
        let app = build_app(AppState::fake());
        let (status, body) = post_json(
            app,
            "/api/v1/auth/register",
            json!({ "email": "bad", "password": "x" }),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["fields"].as_array().unwrap().len(), 2);
    }
}
