use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod services;

pub use model::{Role, UserProfile};
pub use resolver::ProfileResolver;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::me_routes())
}
