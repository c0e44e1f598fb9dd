use serde::{Deserialize, Serialize};

use super::identity::Identity;
use crate::profiles::model::Role;

/// Type of JWT: access or refresh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// JWT payload; carries enough to rebuild the caller's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,                  // uid
    pub iat: usize,                   // issued at (unix timestamp)
    pub exp: usize,                   // expires at (unix timestamp)
    pub iss: String,                  // issuer
    pub aud: String,                  // audience
    pub kind: TokenKind,              // token type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,           // authoritative role claim
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.sub.clone(),
            email: self.email.clone(),
            display_name: self.name.clone(),
            photo_url: self.picture.clone(),
            role_claim: self.role,
        }
    }
}
