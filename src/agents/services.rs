use tracing::{info, instrument};

use super::dto::{AgentDraft, AgentQuery};
use super::model::{Agent, AgentStatus};
use super::repo;
use crate::error::AppError;
use crate::store::DocumentStore;

/// Apply the category and free-text filters of `query`.
pub fn filter_agents(agents: Vec<Agent>, query: &AgentQuery) -> Vec<Agent> {
    let category = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));
    let needle = query
        .q
        .as_deref()
        .map(|q| q.trim().to_lowercase())
        .unwrap_or_default();
    agents
        .into_iter()
        .filter(|a| category.map_or(true, |c| a.category == c))
        .filter(|a| a.matches_search(&needle))
        .collect()
}

/// Published agents only, whatever status the query asks for.
pub async fn catalog(store: &dyn DocumentStore, query: &AgentQuery) -> Result<Vec<Agent>, AppError> {
    let agents = repo::list(store, Some(AgentStatus::Published)).await?;
    Ok(filter_agents(agents, query))
}

pub async fn published(store: &dyn DocumentStore, id: &str) -> Result<Agent, AppError> {
    repo::get(store, id)
        .await?
        .filter(Agent::is_published)
        .ok_or_else(|| AppError::NotFound(format!("agent {id}")))
}

pub async fn admin_list(
    store: &dyn DocumentStore,
    query: &AgentQuery,
) -> Result<Vec<Agent>, AppError> {
    let agents = repo::list(store, query.status).await?;
    Ok(filter_agents(agents, query))
}

#[instrument(skip(store, draft), fields(name = %draft.name))]
pub async fn create(store: &dyn DocumentStore, draft: AgentDraft) -> Result<Agent, AppError> {
    let agent = repo::create(store, draft).await?;
    info!(agent_id = %agent.id, status = agent.status.as_str(), "agent created");
    Ok(agent)
}

#[instrument(skip(store, draft))]
pub async fn update(
    store: &dyn DocumentStore,
    id: &str,
    draft: AgentDraft,
) -> Result<Agent, AppError> {
    let agent = repo::replace(store, id, draft)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("agent {id}")))?;
    info!(agent_id = %agent.id, status = agent.status.as_str(), "agent updated");
    Ok(agent)
}

#[instrument(skip(store))]
pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<(), AppError> {
    repo::delete(store, id).await?;
    info!(agent_id = %id, "agent deleted");
    Ok(())
}
