use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Admin,
    Creator,
}

impl Role {
    /// Admins may enter every subtree; creators also see client pages.
    pub fn satisfies(self, required: Role) -> bool {
        match required {
            Role::Client => true,
            Role::Creator => matches!(self, Role::Creator | Role::Admin),
            Role::Admin => self == Role::Admin,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Admin => "admin",
            Role::Creator => "creator",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Expert,
}

impl ExperienceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "beginner",
            ExperienceLevel::Intermediate => "intermediate",
            ExperienceLevel::Expert => "expert",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "beginner" => Some(ExperienceLevel::Beginner),
            "intermediate" => Some(ExperienceLevel::Intermediate),
            "expert" => Some(ExperienceLevel::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_level: Option<ExperienceLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(with = "crate::store::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "crate::store::timestamp")]
    pub updated_at: OffsetDateTime,
    #[serde(
        default,
        with = "crate::store::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_login_at: Option<OffsetDateTime>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_satisfaction() {
        assert!(Role::Client.satisfies(Role::Client));
        assert!(Role::Admin.satisfies(Role::Client));
        assert!(!Role::Client.satisfies(Role::Admin));
        assert!(!Role::Creator.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Creator));
        assert!(!Role::Client.satisfies(Role::Creator));
    }

    #[test]
    fn profile_uses_wire_field_names() {
        let now = OffsetDateTime::UNIX_EPOCH;
        let profile = UserProfile {
            uid: "u1".into(),
            email: None,
            display_name: Some("Ana".into()),
            photo_url: None,
            role: Role::Client,
            onboarding_completed: false,
            user_goal: None,
            experience_level: Some(ExperienceLevel::Expert),
            company_name: None,
            company_size: None,
            industry: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["displayName"], "Ana");
        assert_eq!(json["photoURL"], serde_json::Value::Null);
        assert_eq!(json["onboardingCompleted"], false);
        assert_eq!(json["experienceLevel"], "expert");
        assert!(json.get("lastLoginAt").is_none());
    }
}
