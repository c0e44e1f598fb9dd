use serde::{Deserialize, Serialize};

use super::model::{Agent, AgentIcon, AgentStatus, InterfaceType};
use crate::error::{AppError, ValidationErrors};

/// Body of `POST /admin/agents` and `PUT /admin/agents/:id`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub interface_type: Option<InterfaceType>,
    #[serde(default)]
    pub prompt_base: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    /// Comma-separated.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub status: Option<AgentStatus>,
    #[serde(default)]
    pub free_trial_offered: bool,
    #[serde(default)]
    pub trial_duration_days: Option<String>,
}

/// Agent fields that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentDraft {
    pub name: String,
    pub description: String,
    pub category: String,
    pub interface_type: InterfaceType,
    pub prompt_base: String,
    pub icon: Option<AgentIcon>,
    pub color: Option<String>,
    pub tags: Vec<String>,
    pub status: AgentStatus,
    pub free_trial_offered: bool,
    pub trial_duration_days: Option<u32>,
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn length_between(
    errors: &mut ValidationErrors,
    field: &str,
    value: &str,
    min: usize,
    max: Option<usize>,
    message: &str,
) {
    let len = value.chars().count();
    if len < min || max.map_or(false, |m| len > m) {
        errors.add(field, message);
    }
}

impl AgentForm {
    pub fn validate(self) -> Result<AgentDraft, AppError> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim().to_string();
        let description = self.description.trim().to_string();
        let category = self.category.trim().to_string();
        let prompt_base = self.prompt_base.trim().to_string();

        length_between(
            &mut errors,
            "name",
            &name,
            3,
            Some(100),
            "Name must be 3 to 100 characters.",
        );
        length_between(
            &mut errors,
            "description",
            &description,
            10,
            Some(500),
            "Description must be 10 to 500 characters.",
        );
        if category.is_empty() {
            errors.add("category", "Category is required.");
        }
        length_between(
            &mut errors,
            "promptBase",
            &prompt_base,
            20,
            None,
            "Base prompt must be at least 20 characters.",
        );

        let icon = match self.icon.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(name) => {
                let icon = AgentIcon::from_name(name);
                if icon.is_none() {
                    errors.add("icon", format!("Unknown icon \"{name}\"."));
                }
                icon
            }
        };

        let trial_duration_days = match self
            .trial_duration_days
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => None,
            Some(raw) if raw.bytes().all(|b| b.is_ascii_digit()) => match raw.parse::<u32>() {
                Ok(days) => Some(days),
                Err(_) => {
                    errors.add("trialDurationDays", "Trial duration is too large.");
                    None
                }
            },
            Some(_) => {
                errors.add("trialDurationDays", "Trial duration must be a number.");
                None
            }
        };

        errors.into_result()?;
        Ok(AgentDraft {
            name,
            description,
            category,
            interface_type: self.interface_type.unwrap_or(InterfaceType::Chat),
            prompt_base,
            icon,
            color: self
                .color
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            tags: self.tags.as_deref().map(split_tags).unwrap_or_default(),
            status: self.status.unwrap_or(AgentStatus::Draft),
            free_trial_offered: self.free_trial_offered,
            trial_duration_days,
        })
    }
}

/// Query string of the catalog and the admin agent table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentQuery {
    pub status: Option<AgentStatus>,
    pub category: Option<String>,
    pub q: Option<String>,
}

/// Agent as returned by the API, with its icon resolved to an asset.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentView {
    #[serde(flatten)]
    pub agent: Agent,
    pub icon_asset: &'static str,
}

impl From<Agent> for AgentView {
    fn from(agent: Agent) -> Self {
        let icon_asset = agent.icon_or_fallback().asset();
        Self { agent, icon_asset }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AgentForm {
        AgentForm {
            name: "Support Sphere".into(),
            description: "Provides instant answers.".into(),
            category: "Customer Support".into(),
            prompt_base: "You are a helpful support agent.".into(),
            icon: Some("Headset".into()),
            tags: Some(" support, ,faq ,".into()),
            trial_duration_days: Some("14".into()),
            ..AgentForm::default()
        }
    }

    fn field_errors(form: AgentForm) -> ValidationErrors {
        match form.validate() {
            Err(AppError::ValidationFailed(v)) => v,
            other => panic!("expected validation failure, got {other:?}"),
        }
    }

    #[test]
    fn valid_form_gets_defaults() {
        let draft = valid().validate().unwrap();
        assert_eq!(draft.status, AgentStatus::Draft);
        assert_eq!(draft.interface_type, InterfaceType::Chat);
        assert_eq!(draft.tags, vec!["support", "faq"]);
        assert_eq!(draft.icon, Some(AgentIcon::Headset));
        assert_eq!(draft.trial_duration_days, Some(14));
    }

    #[test]
    fn every_bad_field_is_reported() {
        let errors = field_errors(AgentForm {
            name: "ab".into(),
            description: "short".into(),
            category: "  ".into(),
            prompt_base: "too short".into(),
            icon: Some("Rocket".into()),
            trial_duration_days: Some("7d".into()),
            ..AgentForm::default()
        });
        for field in [
            "name",
            "description",
            "category",
            "promptBase",
            "icon",
            "trialDurationDays",
        ] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn length_limits_are_inclusive() {
        let mut form = valid();
        form.name = "x".repeat(100);
        form.description = "y".repeat(500);
        assert!(form.clone().validate().is_ok());

        form.name = "x".repeat(101);
        assert!(field_errors(form).has("name"));
    }

    #[test]
    fn blank_optional_fields_are_absent() {
        let mut form = valid();
        form.icon = Some(" ".into());
        form.trial_duration_days = Some(String::new());
        form.tags = None;
        let draft = form.validate().unwrap();
        assert_eq!(draft.icon, None);
        assert_eq!(draft.trial_duration_days, None);
        assert!(draft.tags.is_empty());
    }
}
