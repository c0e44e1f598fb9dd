//! Prompt-execution seam: templates rendered locally, executed remotely.

use std::time::Duration;

use async_trait::async_trait;
use minijinja::{Environment, UndefinedBehavior};
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::GeneratorConfig;

/// A named prompt. `text` is a minijinja template over the flow's input.
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub text: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("no content generator is configured")]
    NotConfigured,
    #[error("prompt template {name}: {message}")]
    Template { name: &'static str, message: String },
    #[error("generator request failed: {0}")]
    Transport(String),
    #[error("generator returned HTTP {0}")]
    Status(u16),
    #[error("generator output is malformed: {0}")]
    InvalidOutput(String),
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Run `template` over `variables` and return the structured output.
    async fn generate(
        &self,
        template: &PromptTemplate,
        variables: &Value,
    ) -> Result<Value, GenerationError>;
}

/// Render `template` with `variables`. Missing variables are an error.
pub fn render_prompt(template: &PromptTemplate, variables: &Value) -> Result<String, GenerationError> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.render_str(template.text, variables)
        .map_err(|e| GenerationError::Template {
            name: template.name,
            message: e.to_string(),
        })
}

/// Posts `{"name", "prompt"}` to the configured endpoint and expects
/// `{"output": ...}` back.
pub struct HttpContentGenerator {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpContentGenerator {
    pub fn new(cfg: &GeneratorConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: cfg.url.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl ContentGenerator for HttpContentGenerator {
    #[instrument(skip(self, variables), fields(prompt = template.name))]
    async fn generate(
        &self,
        template: &PromptTemplate,
        variables: &Value,
    ) -> Result<Value, GenerationError> {
        let prompt = render_prompt(template, variables)?;
        let mut request = self
            .client
            .post(&self.url)
            .json(&json!({ "name": template.name, "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let resp = request.send().await.map_err(|e| {
            warn!(error = %e, "generator unreachable");
            GenerationError::Transport(e.to_string())
        })?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "generator rejected request");
            return Err(GenerationError::Status(status.as_u16()));
        }
        let mut body: Value = resp
            .json()
            .await
            .map_err(|e| GenerationError::InvalidOutput(e.to_string()))?;
        debug!("generator responded");
        match body.get_mut("output") {
            Some(output) => Ok(output.take()),
            None => Err(GenerationError::InvalidOutput("missing \"output\" field".into())),
        }
    }
}

/// Used when no endpoint is configured; every call fails.
pub struct DisabledGenerator;

#[async_trait]
impl ContentGenerator for DisabledGenerator {
    async fn generate(&self, _: &PromptTemplate, _: &Value) -> Result<Value, GenerationError> {
        Err(GenerationError::NotConfigured)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const GREETING: PromptTemplate = PromptTemplate {
        name: "greeting",
        text: "Hello {{ name }}, goal: {{ goal }}",
    };

    #[test]
    fn renders_variables() {
        let out = render_prompt(&GREETING, &json!({ "name": "Ada", "goal": "ship" })).unwrap();
        assert_eq!(out, "Hello Ada, goal: ship");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = render_prompt(&GREETING, &json!({ "name": "Ada" })).unwrap_err();
        assert!(matches!(err, GenerationError::Template { name: "greeting", .. }));
    }

    #[tokio::test]
    async fn disabled_generator_refuses() {
        let err = DisabledGenerator
            .generate(&GREETING, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::NotConfigured));
    }
}
