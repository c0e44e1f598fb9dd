use std::collections::HashSet;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Who counts as an administrator.
///
/// `admin_emails` is authoritative: the identity layer stamps a role claim
/// for these addresses. `dev_marker` is a substring match meant for local
/// development only and is off unless `DEV_ADMIN_EMAIL_MARKER` is set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminPolicy {
    pub admin_emails: HashSet<String>,
    pub dev_marker: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// `None` runs the hub on the in-memory document store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub admin: AdminPolicy,
    pub generator: Option<GeneratorConfig>,
}

impl AdminPolicy {
    pub fn from_parts(admin_emails: &str, dev_marker: Option<String>) -> Self {
        let admin_emails = admin_emails
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            admin_emails,
            dev_marker: dev_marker.filter(|m| !m.is_empty()),
        }
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        self.admin_emails.contains(&email.trim().to_lowercase())
    }

    pub fn matches_dev_marker(&self, email: Option<&str>) -> bool {
        match (&self.dev_marker, email) {
            (Some(marker), Some(email)) => email.contains(marker.as_str()),
            _ => false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "agenthub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "agenthub-users".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };
        let admin = AdminPolicy::from_parts(
            &std::env::var("ADMIN_EMAILS").unwrap_or_default(),
            std::env::var("DEV_ADMIN_EMAIL_MARKER").ok(),
        );
        let generator = std::env::var("GENERATOR_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .map(|url| GeneratorConfig {
                url,
                api_key: std::env::var("GENERATOR_API_KEY").ok(),
                timeout_secs: std::env::var("GENERATOR_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(30),
            });
        Ok(Self {
            database_url,
            jwt,
            admin,
            generator,
        })
    }
}
