use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, instrument, warn};

use super::classifier::TextClassifier;
use crate::error::AppError;
use crate::interactions::model::{Interaction, ModeratedField, ModerationResult};
use crate::interactions::repo;
use crate::store::DocumentStore;

type PairKey = (String, ModeratedField);

/// Runs classification for one side of an interaction and records the verdict.
#[derive(Clone)]
pub struct ModerationWorkflow {
    store: Arc<dyn DocumentStore>,
    classifier: Arc<dyn TextClassifier>,
    in_flight: Arc<Mutex<HashSet<PairKey>>>,
}

/// Holds a pair in the in-flight set until dropped.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<PairKey>>,
    key: PairKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

/// Verdict plus a short operator-facing notice.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationOutcome {
    pub interaction: Interaction,
    pub title: String,
    pub description: String,
}

fn notice(result: &ModerationResult, field: ModeratedField) -> (String, String) {
    let title = if result.is_safe {
        "Content Moderated (Safe)"
    } else {
        "Content Moderated (Not Safe)"
    };
    let description = match (&result.reason, result.is_safe) {
        (Some(reason), _) => reason.clone(),
        (None, true) => format!("Content ({field}) appears to be safe."),
        (None, false) => format!("Content ({field}) was judged unsafe."),
    };
    (title.to_string(), description)
}

impl ModerationWorkflow {
    pub fn new(store: Arc<dyn DocumentStore>, classifier: Arc<dyn TextClassifier>) -> Self {
        Self {
            store,
            classifier,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn is_in_flight(&self, interaction_id: &str, field: ModeratedField) -> bool {
        let set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(&(interaction_id.to_string(), field))
    }

    fn claim(&self, interaction_id: &str, field: ModeratedField) -> Result<InFlight<'_>, AppError> {
        let key = (interaction_id.to_string(), field);
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.clone()) {
            return Err(AppError::ModerationInFlight {
                interaction_id: interaction_id.to_string(),
                field: field.to_string(),
            });
        }
        Ok(InFlight {
            set: &self.in_flight,
            key,
        })
    }

    /// Classify `field` of the interaction and overwrite its moderation result.
    ///
    /// A second call for the same pair fails with `ModerationInFlight` while
    /// the first is running. On classifier or store failure the stored
    /// record keeps its previous result.
    #[instrument(skip(self))]
    pub async fn moderate(
        &self,
        interaction_id: &str,
        field: ModeratedField,
        moderated_by: Option<&str>,
    ) -> Result<ModerationOutcome, AppError> {
        let _claim = self.claim(interaction_id, field)?;

        let mut interaction = repo::get(self.store.as_ref(), interaction_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("interaction {interaction_id}")))?;

        let text = interaction.text_for(field);
        let verdict = self.classifier.classify(&text).await.map_err(|e| {
            warn!(error = %e, "classification failed");
            AppError::ClassificationFailed(e.0)
        })?;

        let result = ModerationResult {
            is_safe: verdict.is_safe,
            reason: verdict.reason,
            moderated_at: OffsetDateTime::now_utc(),
            moderated_by: moderated_by.map(str::to_string),
            type_moderated: Some(field),
        };
        repo::set_moderation_result(self.store.as_ref(), interaction_id, &result).await?;
        info!(is_safe = result.is_safe, "interaction moderated");

        let (title, description) = notice(&result, field);
        interaction.moderation_result = Some(result);
        Ok(ModerationOutcome {
            interaction,
            title,
            description,
        })
    }
}
