use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::assist::generator::{ContentGenerator, PromptTemplate};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub is_safe: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ClassificationError(pub String);

#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Verdict, ClassificationError>;
}

pub const MODERATION: PromptTemplate = PromptTemplate {
    name: "content_moderation",
    text: "You are a content moderator for an AI agent marketplace.\n\
Decide whether the following text is safe to show to other users. Text is \
unsafe if it contains harassment, hate, sexual content, self-harm, \
violence or personal data.\n\n\
Text:\n{{ text }}\n\n\
Answer as JSON: {\"isSafe\": boolean, \"reason\": string}",
};

/// Classifies by running [`MODERATION`] through a content generator.
pub struct PromptClassifier {
    generator: Arc<dyn ContentGenerator>,
}

impl PromptClassifier {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl TextClassifier for PromptClassifier {
    async fn classify(&self, text: &str) -> Result<Verdict, ClassificationError> {
        let output = self
            .generator
            .generate(&MODERATION, &json!({ "text": text }))
            .await
            .map_err(|e| ClassificationError(e.to_string()))?;
        let mut verdict: Verdict = serde_json::from_value(output)
            .map_err(|e| ClassificationError(format!("unexpected verdict shape: {e}")))?;
        verdict.reason = verdict
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        Ok(verdict)
    }
}
