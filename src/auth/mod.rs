use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
pub mod handlers;
pub mod identity;
pub mod jwt;
pub mod local;
pub mod password;
pub mod repo;

pub use claims::{Claims, TokenKind};
pub use extractors::AuthUser;
pub use identity::{on_identity_changed, Identity, IdentityProvider, Subscription};
pub use jwt::JwtKeys;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
