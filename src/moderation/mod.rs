//! Content moderation for recorded interactions.

use crate::state::AppState;
use axum::Router;

pub mod classifier;
pub mod handlers;
pub mod workflow;

pub use classifier::{PromptClassifier, TextClassifier, Verdict};
pub use workflow::{ModerationOutcome, ModerationWorkflow};

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::admin_routes())
}
