use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};

use super::claims::TokenKind;
use super::identity::Identity;
use super::jwt::JwtKeys;
use crate::error::AppError;

/// Bearer token from the `Authorization` header, if any.
pub(crate) fn bearer_token(parts: &Parts) -> Option<&str> {
    let auth = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
}

pub(crate) fn identity_from_token(keys: &JwtKeys, token: &str) -> Result<Identity, AppError> {
    let claims = keys
        .verify(token)
        .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;
    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("access token required".into()));
    }
    Ok(claims.identity())
}

/// Extracts and validates the access token, yielding the caller's identity.
pub struct AuthUser(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
        let keys = JwtKeys::from_ref(state);
        Ok(AuthUser(identity_from_token(&keys, token)?))
    }
}
