//! Per-request route guard for the HTTP API.

use std::marker::PhantomData;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::LOCATION, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, warn};

use super::{evaluate, GuardDecision};
use crate::auth::extractors::{bearer_token, identity_from_token};
use crate::auth::{Identity, JwtKeys};
use crate::profiles::model::{Role, UserProfile};
use crate::state::AppState;

/// Role a guarded route requires.
pub trait RequiredRole: Send + Sync + 'static {
    const ROLE: Role;
}

/// Any signed-in, onboarded user.
pub struct ClientArea;
/// Admins only.
pub struct AdminArea;

impl RequiredRole for ClientArea {
    const ROLE: Role = Role::Client;
}

impl RequiredRole for AdminArea {
    const ROLE: Role = Role::Admin;
}

/// A caller the guard let through, with their resolved profile.
pub struct RequireRole<R: RequiredRole> {
    pub identity: Identity,
    pub profile: UserProfile,
    _role: PhantomData<R>,
}

#[async_trait]
impl<R: RequiredRole> FromRequestParts<AppState> for RequireRole<R> {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Response> {
        let identity = match bearer_token(parts) {
            Some(token) => match identity_from_token(&JwtKeys::from_ref(state), token) {
                Ok(identity) => Some(identity),
                Err(e) => {
                    warn!(error = %e, "bearer token rejected; treating caller as anonymous");
                    None
                }
            },
            None => None,
        };

        let profile = match &identity {
            Some(identity) => Some(state.profiles.resolve(identity).await),
            None => None,
        };

        let path = parts.uri.path();
        match evaluate(profile.as_ref(), false, path, R::ROLE, &state.guard_paths) {
            GuardDecision::Allow => match (identity, profile) {
                (Some(identity), Some(profile)) => Ok(Self {
                    identity,
                    profile,
                    _role: PhantomData,
                }),
                // only the login page is open to anonymous callers
                _ => Err(see_other(&state.guard_paths.home)),
            },
            GuardDecision::Redirect(redirect) => {
                let location = redirect.location(&state.guard_paths);
                debug!(path, location = %location, role = R::ROLE.as_str(), "guard redirect");
                Err(see_other(&location))
            }
            GuardDecision::Pending => Err(StatusCode::SERVICE_UNAVAILABLE.into_response()),
        }
    }
}

fn see_other(location: &str) -> Response {
    (
        StatusCode::SEE_OTHER,
        [(LOCATION, location.to_string())],
        Json(json!({ "redirect": location })),
    )
        .into_response()
}
