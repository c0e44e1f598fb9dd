use serde_json::json;
use time::OffsetDateTime;

use super::model::{Feedback, InputContent, Interaction, ModerationResult};
use crate::agents::model::InterfaceType;
use crate::store::{encode, DocumentStore, Filter, Order, StoreResult, INTERACTIONS};

const ID_FIELD: &str = "id";

pub struct NewInteraction {
    pub user_id: String,
    pub agent_id: String,
    pub input_type: InterfaceType,
    pub input_content: InputContent,
    pub output_content: String,
    pub session_id: Option<String>,
}

fn decode_all(docs: Vec<crate::store::Document>) -> StoreResult<Vec<Interaction>> {
    docs.into_iter().map(|d| d.decode(ID_FIELD)).collect()
}

pub async fn get(store: &dyn DocumentStore, id: &str) -> StoreResult<Option<Interaction>> {
    match store.get(INTERACTIONS, id).await? {
        Some(doc) => Ok(Some(doc.decode(ID_FIELD)?)),
        None => Ok(None),
    }
}

pub async fn list_for_user(store: &dyn DocumentStore, user_id: &str) -> StoreResult<Vec<Interaction>> {
    let docs = store
        .list(
            INTERACTIONS,
            &[Filter::eq("userId", user_id)],
            Some(&Order::desc("timestamp")),
        )
        .await?;
    decode_all(docs)
}

/// Flagged interactions, newest first.
pub async fn list_flagged(store: &dyn DocumentStore) -> StoreResult<Vec<Interaction>> {
    let docs = store
        .list(
            INTERACTIONS,
            &[Filter::eq("isFlaggedForModeration", true)],
            Some(&Order::desc("timestamp")),
        )
        .await?;
    decode_all(docs)
}

pub async fn create(store: &dyn DocumentStore, new: NewInteraction) -> StoreResult<Interaction> {
    let mut interaction = Interaction {
        id: String::new(),
        user_id: new.user_id,
        agent_id: new.agent_id,
        timestamp: OffsetDateTime::now_utc(),
        input_type: new.input_type,
        input_content: new.input_content,
        output_content: new.output_content,
        is_flagged_for_moderation: None,
        moderation_result: None,
        feedback: None,
        session_id: new.session_id,
    };
    interaction.id = store
        .create(INTERACTIONS, encode(&interaction, ID_FIELD)?)
        .await?;
    Ok(interaction)
}

/// Replaces any earlier verdict as a whole.
pub async fn set_moderation_result(
    store: &dyn DocumentStore,
    id: &str,
    result: &ModerationResult,
) -> StoreResult<()> {
    store
        .update(INTERACTIONS, id, json!({ "moderationResult": result }))
        .await
}

pub async fn set_feedback(store: &dyn DocumentStore, id: &str, feedback: &Feedback) -> StoreResult<()> {
    store
        .update(INTERACTIONS, id, json!({ "feedback": feedback }))
        .await
}

pub async fn flag(store: &dyn DocumentStore, id: &str) -> StoreResult<()> {
    store
        .update(INTERACTIONS, id, json!({ "isFlaggedForModeration": true }))
        .await
}
