use axum::{
    extract::{Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use super::dto::{AgentForm, AgentQuery, AgentView};
use super::services;
use crate::{
    error::AppError,
    guard::extractor::{AdminArea, ClientArea, RequireRole},
    state::AppState,
};

pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_catalog))
        .route("/agents/:id", get(get_agent))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/agents", get(admin_list).post(create_agent))
        .route("/admin/agents/:id", axum::routing::put(update_agent).delete(delete_agent))
}

fn views(agents: Vec<super::model::Agent>) -> Vec<AgentView> {
    agents.into_iter().map(AgentView::from).collect()
}

#[instrument(skip(state, _guard))]
pub async fn list_catalog(
    State(state): State<AppState>,
    _guard: RequireRole<ClientArea>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<Vec<AgentView>>, AppError> {
    let agents = services::catalog(state.store.as_ref(), &query).await?;
    Ok(Json(views(agents)))
}

#[instrument(skip(state, _guard))]
pub async fn get_agent(
    State(state): State<AppState>,
    _guard: RequireRole<ClientArea>,
    Path(id): Path<String>,
) -> Result<Json<AgentView>, AppError> {
    let agent = services::published(state.store.as_ref(), &id).await?;
    Ok(Json(agent.into()))
}

#[instrument(skip(state, _guard))]
pub async fn admin_list(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
    Query(query): Query<AgentQuery>,
) -> Result<Json<Vec<AgentView>>, AppError> {
    let agents = services::admin_list(state.store.as_ref(), &query).await?;
    Ok(Json(views(agents)))
}

#[instrument(skip(state, _guard, form))]
pub async fn create_agent(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
    Json(form): Json<AgentForm>,
) -> Result<(StatusCode, HeaderMap, Json<AgentView>), AppError> {
    let agent = services::create(state.store.as_ref(), form.validate()?).await?;
    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/admin/agents/{}", agent.id)) {
        headers.insert(LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(agent.into())))
}

#[instrument(skip(state, _guard, form))]
pub async fn update_agent(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
    Path(id): Path<String>,
    Json(form): Json<AgentForm>,
) -> Result<Json<AgentView>, AppError> {
    let agent = services::update(state.store.as_ref(), &id, form.validate()?).await?;
    Ok(Json(agent.into()))
}

#[instrument(skip(state, _guard))]
pub async fn delete_agent(
    State(state): State<AppState>,
    _guard: RequireRole<AdminArea>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    services::delete(state.store.as_ref(), &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::auth::identity::testing::identity;
    use crate::auth::{Identity, JwtKeys};
    use crate::profiles::{model::Role, repo as profile_repo};
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

    fn admin() -> Identity {
        let mut a = identity("admin-1", Some("ops@example.com"));
        a.role_claim = Some(Role::Admin);
        a
    }

    async fn onboarded_client(state: &AppState) -> Identity {
        let who = identity("client-1", Some("c@example.com"));
        state.profiles.resolve(&who).await;
        profile_repo::mark_onboarded(state.store.as_ref(), &who.uid, None, None)
            .await
            .unwrap();
        who
    }

    fn form(name: &str, status: &str) -> Value {
        json!({
            "name": name,
            "description": "Answers customer questions fast.",
            "category": "Customer Support",
            "interfaceType": "chat",
            "promptBase": "You are a friendly support assistant.",
            "icon": "Headset",
            "tags": "support, faq",
            "status": status,
            "freeTrialOffered": true,
            "trialDurationDays": "14"
        })
    }

    #[tokio::test]
    async fn admin_crud_and_client_catalog() {
        let state = AppState::fake();
        let client = onboarded_client(&state).await;

        let (status, created) =
            send(&state, "POST", "/api/v1/admin/agents", &admin(), Some(form("Support Sphere", "published"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["iconAsset"], "icons/headset.svg");
        assert_eq!(created["tags"], json!(["support", "faq"]));
        let id = created["id"].as_str().unwrap().to_string();

        send(&state, "POST", "/api/v1/admin/agents", &admin(), Some(form("Draft Drafter", "draft"))).await;

        let (status, listed) = send(&state, "GET", "/api/v1/agents?q=SUPPORT", &client, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);

        let (status, listed) =
            send(&state, "GET", "/api/v1/admin/agents?status=draft", &admin(), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed[0]["name"], "Draft Drafter");

        let (status, updated) = send(
            &state,
            "PUT",
            &format!("/api/v1/admin/agents/{id}"),
            &admin(),
            Some(form("Support Sphere 2", "archived")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["status"], "archived");

        let (status, _) = send(&state, "GET", &format!("/api/v1/agents/{id}"), &client, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) =
            send(&state, "DELETE", &format!("/api/v1/admin/agents/{id}"), &admin(), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) =
            send(&state, "DELETE", &format!("/api/v1/admin/agents/{id}"), &admin(), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_with_fields() {
        let state = AppState::fake();
        let mut bad = form("ab", "draft");
        bad["icon"] = json!("Rocket");
        let (status, body) = send(&state, "POST", "/api/v1/admin/agents", &admin(), Some(bad)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields: Vec<_> = body["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["field"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(fields, vec!["name", "icon"]);
    }
}
