use serde::{Deserialize, Serialize};

use super::model::{ExperienceLevel, Role, UserProfile};
use super::repo::{AdminEdit, CompanyDetails};
use crate::error::{AppError, ValidationErrors};

/// Body of `POST /onboarding`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRequest {
    pub user_goal: String,
    pub experience_level: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_size: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
}

/// Validated onboarding answers.
#[derive(Debug, Clone)]
pub struct OnboardingForm {
    pub user_goal: String,
    pub experience_level: ExperienceLevel,
    pub company: CompanyDetails,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl OnboardingRequest {
    pub fn validate(self) -> Result<OnboardingForm, AppError> {
        let mut errors = ValidationErrors::new();
        let goal = self.user_goal.trim().to_string();
        let goal_len = goal.chars().count();
        if goal_len < 10 {
            errors.add(
                "userGoal",
                "Please describe your primary goal in a bit more detail (at least 10 characters).",
            );
        } else if goal_len > 500 {
            errors.add("userGoal", "Goal must be at most 500 characters.");
        }
        let level = ExperienceLevel::parse(self.experience_level.trim());
        if level.is_none() {
            errors.add(
                "experienceLevel",
                "Experience level must be one of beginner, intermediate, expert.",
            );
        }
        match level {
            Some(experience_level) if errors.is_empty() => Ok(OnboardingForm {
                user_goal: goal,
                experience_level,
                company: CompanyDetails {
                    company_name: non_blank(self.company_name),
                    company_size: non_blank(self.company_size),
                    industry: non_blank(self.industry),
                },
            }),
            _ => Err(AppError::ValidationFailed(errors)),
        }
    }
}

/// Body of `PATCH /admin/users/:uid`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserPatch {
    pub role: Option<Role>,
    pub onboarding_completed: Option<bool>,
    pub display_name: Option<String>,
}

impl AdminUserPatch {
    pub fn validate(self) -> Result<AdminEdit, AppError> {
        let mut errors = ValidationErrors::new();
        let display_name = self.display_name.map(|n| n.trim().to_string());
        if let Some(name) = &display_name {
            if name.is_empty() || name.chars().count() > 100 {
                errors.add("displayName", "Display name must be 1 to 100 characters.");
            }
        }
        if self.role.is_none() && self.onboarding_completed.is_none() && display_name.is_none() {
            errors.add("body", "Nothing to update.");
        }
        errors.into_result()?;
        Ok(AdminEdit {
            role: self.role,
            onboarding_completed: self.onboarding_completed,
            display_name,
        })
    }
}

/// Row of `GET /admin/users`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub role: Role,
    pub onboarding_completed: bool,
    #[serde(with = "crate::store::timestamp")]
    pub created_at: time::OffsetDateTime,
}

impl From<UserProfile> for UserListItem {
    fn from(p: UserProfile) -> Self {
        Self {
            uid: p.uid,
            email: p.email,
            display_name: p.display_name,
            role: p.role,
            onboarding_completed: p.onboarding_completed,
            created_at: p.created_at,
        }
    }
}
