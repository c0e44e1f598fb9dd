use crate::state::AppState;
use axum::Router;

pub mod flows;
pub mod generator;
pub mod handlers;

pub use generator::{ContentGenerator, DisabledGenerator, HttpContentGenerator};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::assist_routes())
}
