//! Structured generation flows with fixed input and output schemas.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

use super::generator::{ContentGenerator, PromptTemplate};
use crate::error::{AppError, ValidationErrors};

pub const ONBOARDING_ASSISTANCE: PromptTemplate = PromptTemplate {
    name: "onboarding_assistance",
    text: "You are an AI assistant that onboards new users to the agent hub.\n\
Based on the user's stated goal and experience level, write a personalized \
onboarding message and suggest a few key actions they can take to get started.\n\n\
User goal: {{ userGoal }}\n\
Experience level: {{ experienceLevel }}\n\n\
Answer as JSON: {\"onboardingMessage\": string, \"suggestedActions\": [string]}",
};

pub const FEEDBACK_ANALYSIS: PromptTemplate = PromptTemplate {
    name: "feedback_analysis",
    text: "You are an AI assistant helping to analyze user feedback.\n\
Determine the sentiment (positive, negative or neutral), the main topic and a \
brief summary of the following feedback.\n\n\
Feedback: {{ feedbackText }}\n\n\
Answer as JSON: {\"sentiment\": \"positive\"|\"negative\"|\"neutral\", \
\"topic\": string, \"summary\": string}",
};

pub const MAX_FEEDBACK_CHARS: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingAssistanceInput {
    pub user_goal: String,
    pub experience_level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OnboardingAssistance {
    pub onboarding_message: String,
    pub suggested_actions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackAnalysisInput {
    pub feedback_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedbackAnalysis {
    pub sentiment: Sentiment,
    pub topic: String,
    pub summary: String,
}

fn parse_output<T: DeserializeOwned>(template: &PromptTemplate, output: Value) -> Result<T, AppError> {
    serde_json::from_value(output).map_err(|e| {
        warn!(prompt = template.name, error = %e, "generator output rejected");
        AppError::GenerationFailed(format!("{} output does not match its schema: {e}", template.name))
    })
}

async fn run<T: DeserializeOwned>(
    generator: &dyn ContentGenerator,
    template: &PromptTemplate,
    input: &impl Serialize,
) -> Result<T, AppError> {
    let variables = serde_json::to_value(input).map_err(anyhow::Error::from)?;
    let output = generator
        .generate(template, &variables)
        .await
        .map_err(|e| {
            warn!(prompt = template.name, error = %e, "generation failed");
            AppError::GenerationFailed(e.to_string())
        })?;
    parse_output(template, output)
}

#[instrument(skip(generator, input))]
pub async fn onboarding_assistance(
    generator: &dyn ContentGenerator,
    input: OnboardingAssistanceInput,
) -> Result<OnboardingAssistance, AppError> {
    let mut errors = ValidationErrors::new();
    if input.user_goal.trim().is_empty() {
        errors.add("userGoal", "Goal is required.");
    }
    if input.experience_level.trim().is_empty() {
        errors.add("experienceLevel", "Experience level is required.");
    }
    errors.into_result()?;

    let out: OnboardingAssistance = run(generator, &ONBOARDING_ASSISTANCE, &input).await?;
    if out.onboarding_message.trim().is_empty() {
        return Err(AppError::GenerationFailed(
            "onboarding message is empty".into(),
        ));
    }
    info!(actions = out.suggested_actions.len(), "onboarding assistance generated");
    Ok(out)
}

#[instrument(skip(generator, input))]
pub async fn analyze_feedback(
    generator: &dyn ContentGenerator,
    input: FeedbackAnalysisInput,
) -> Result<FeedbackAnalysis, AppError> {
    let mut errors = ValidationErrors::new();
    let len = input.feedback_text.trim().chars().count();
    if len == 0 {
        errors.add("feedbackText", "Feedback text is required.");
    } else if len > MAX_FEEDBACK_CHARS {
        errors.add(
            "feedbackText",
            format!("Feedback must be at most {MAX_FEEDBACK_CHARS} characters."),
        );
    }
    errors.into_result()?;

    let out: FeedbackAnalysis = run(generator, &FEEDBACK_ANALYSIS, &input).await?;
    info!(sentiment = ?out.sentiment, topic = %out.topic, "feedback analyzed");
    Ok(out)
}
