use serde::{Deserialize, Serialize};

use super::repo::Account;
use crate::error::{AppError, ValidationErrors};

use super::password::{is_valid_email, normalize_email, MIN_PASSWORD_LEN};

/// Request body for account registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl RegisterRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.email = normalize_email(&self.email);
        self.display_name = self
            .display_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let mut errors = ValidationErrors::new();
        if !is_valid_email(&self.email) {
            errors.add("email", "Invalid email");
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        if self.display_name.as_ref().map_or(false, |n| n.chars().count() > 100) {
            errors.add("displayName", "Display name must be at most 100 characters");
        }
        errors.into_result()?;
        Ok(self)
    }
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after login, register or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the account returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl From<&Account> for PublicUser {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id.clone(),
            email: a.email.clone(),
            display_name: a.display_name.clone(),
        }
    }
}
