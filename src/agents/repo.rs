use time::OffsetDateTime;

use super::dto::AgentDraft;
use super::model::{Agent, AgentStatus};
use crate::store::{encode, new_id, DocumentStore, Filter, Order, StoreResult, AGENTS};

const ID_FIELD: &str = "id";

pub async fn list(store: &dyn DocumentStore, status: Option<AgentStatus>) -> StoreResult<Vec<Agent>> {
    let filters: Vec<Filter> = status
        .map(|s| Filter::eq("status", s.as_str()))
        .into_iter()
        .collect();
    store
        .list(AGENTS, &filters, Some(&Order::asc("name")))
        .await?
        .into_iter()
        .map(|d| d.decode(ID_FIELD))
        .collect()
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> StoreResult<Option<Agent>> {
    match store.get(AGENTS, id).await? {
        Some(doc) => Ok(Some(doc.decode(ID_FIELD)?)),
        None => Ok(None),
    }
}

fn from_draft(id: String, draft: AgentDraft, created_at: OffsetDateTime, now: OffsetDateTime) -> Agent {
    Agent {
        id,
        name: draft.name,
        description: draft.description,
        category: draft.category,
        interface_type: draft.interface_type,
        prompt_base: draft.prompt_base,
        icon: draft.icon,
        color: draft.color,
        tags: draft.tags,
        status: draft.status,
        free_trial_offered: draft.free_trial_offered,
        trial_duration_days: draft.trial_duration_days,
        created_at,
        updated_at: now,
    }
}

pub async fn create(store: &dyn DocumentStore, draft: AgentDraft) -> StoreResult<Agent> {
    let now = OffsetDateTime::now_utc();
    let agent = from_draft(new_id(), draft, now, now);
    store
        .put(AGENTS, &agent.id, encode(&agent, ID_FIELD)?)
        .await?;
    Ok(agent)
}

/// Replace every editable field; `createdAt` is kept. `None` when absent.
pub async fn replace(
    store: &dyn DocumentStore,
    id: &str,
    draft: AgentDraft,
) -> StoreResult<Option<Agent>> {
    let Some(existing) = get(store, id).await? else {
        return Ok(None);
    };
    let agent = from_draft(
        existing.id,
        draft,
        existing.created_at,
        OffsetDateTime::now_utc(),
    );
    store
        .put(AGENTS, &agent.id, encode(&agent, ID_FIELD)?)
        .await?;
    Ok(Some(agent))
}

pub async fn delete(store: &dyn DocumentStore, id: &str) -> StoreResult<()> {
    store.delete(AGENTS, id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::dto::AgentForm;
    use crate::store::MemoryDocumentStore;

    fn draft(name: &str, status: AgentStatus) -> AgentDraft {
        let mut d = AgentForm {
            name: name.into(),
            description: "Does useful things for you.".into(),
            category: "Productivity".into(),
            prompt_base: "You are a productive assistant.".into(),
            ..AgentForm::default()
        }
        .validate()
        .unwrap();
        d.status = status;
        d
    }

    #[tokio::test]
    async fn list_filters_by_status_and_sorts_by_name() {
        let store = MemoryDocumentStore::new();
        create(&store, draft("Zeta", AgentStatus::Published)).await.unwrap();
        create(&store, draft("Alpha", AgentStatus::Published)).await.unwrap();
        create(&store, draft("Hidden", AgentStatus::Draft)).await.unwrap();

        let published = list(&store, Some(AgentStatus::Published)).await.unwrap();
        let names: Vec<_> = published.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(list(&store, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn replace_keeps_created_at_and_clears_dropped_fields() {
        let store = MemoryDocumentStore::new();
        let mut first = draft("Alpha", AgentStatus::Draft);
        first.trial_duration_days = Some(7);
        let created = create(&store, first).await.unwrap();

        let updated = replace(&store, &created.id, draft("Alpha v2", AgentStatus::Published))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.created_at, created.created_at);

        let stored = get(&store, &created.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Alpha v2");
        assert_eq!(stored.trial_duration_days, None);

        assert!(replace(&store, "missing", draft("X agent", AgentStatus::Draft))
            .await
            .unwrap()
            .is_none());
    }
}
