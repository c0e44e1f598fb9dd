use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;
use tracing::warn;

use super::identity::Identity;
use super::password::{is_valid_email, normalize_email, verify_password};
use crate::config::AdminPolicy;
use crate::error::AppError;
use crate::profiles::model::Role;
use crate::store::{encode, new_id, timestamp, DocumentStore, Filter, StoreResult, ACCOUNTS};

const ID_FIELD: &str = "id";

/// Local credential record backing the built-in identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, rename = "photoURL")]
    pub photo_url: Option<String>,
    #[serde(with = "crate::store::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(default, with = "crate::store::timestamp::option")]
    pub last_sign_out_at: Option<OffsetDateTime>,
}

impl Account {
    /// Identity as the provider reports it. The role claim is only issued
    /// for addresses on the configured admin list.
    pub fn identity(&self, policy: &AdminPolicy) -> Identity {
        Identity {
            uid: self.id.clone(),
            email: Some(self.email.clone()),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            role_claim: policy.is_admin_email(&self.email).then_some(Role::Admin),
        }
    }

    pub async fn find_by_email(
        store: &dyn DocumentStore,
        email: &str,
    ) -> StoreResult<Option<Account>> {
        let docs = store
            .list(ACCOUNTS, &[Filter::eq("email", email)], None)
            .await?;
        docs.into_iter()
            .next()
            .map(|d| d.decode(ID_FIELD))
            .transpose()
    }

    pub async fn find_by_id(store: &dyn DocumentStore, id: &str) -> StoreResult<Option<Account>> {
        match store.get(ACCOUNTS, id).await? {
            Some(doc) => Ok(Some(doc.decode(ID_FIELD)?)),
            None => Ok(None),
        }
    }

    pub async fn create(
        store: &dyn DocumentStore,
        email: &str,
        password_hash: &str,
        display_name: Option<String>,
    ) -> StoreResult<Account> {
        let account = Account {
            id: new_id(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            display_name,
            photo_url: None,
            created_at: OffsetDateTime::now_utc(),
            last_sign_out_at: None,
        };
        store
            .put(ACCOUNTS, &account.id, encode(&account, ID_FIELD)?)
            .await?;
        Ok(account)
    }

    pub async fn record_sign_out(store: &dyn DocumentStore, id: &str) -> StoreResult<()> {
        let now = timestamp::now()?;
        store
            .update(ACCOUNTS, id, json!({ "lastSignOutAt": now }))
            .await
    }

    /// Check an email/password pair. Unknown emails and wrong passwords are
    /// indistinguishable to the caller.
    pub async fn authenticate(
        store: &dyn DocumentStore,
        email: &str,
        password: &str,
    ) -> Result<Account, AppError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
        let Some(account) = Account::find_by_email(store, &email).await? else {
            warn!(email = %email, "login unknown email");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        };
        if !verify_password(password, &account.password_hash)? {
            warn!(email = %email, uid = %account.id, "login invalid password");
            return Err(AppError::Unauthorized("Invalid credentials".into()));
        }
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::hash_password;
    use crate::store::MemoryDocumentStore;

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let store = MemoryDocumentStore::new();
        let created = Account::create(&store, "a@example.com", "hash", Some("Ada".into()))
            .await
            .unwrap();

        let by_email = Account::find_by_email(&store, "a@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.display_name.as_deref(), Some("Ada"));

        let by_id = Account::find_by_id(&store, &created.id).await.unwrap();
        assert!(by_id.is_some());
        assert!(Account::find_by_email(&store, "b@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let store = MemoryDocumentStore::new();
        let hash = hash_password("long-enough-pw").unwrap();
        Account::create(&store, "a@example.com", &hash, None)
            .await
            .unwrap();

        let ok = Account::authenticate(&store, " A@Example.com ", "long-enough-pw").await;
        assert!(ok.is_ok());

        let bad = Account::authenticate(&store, "a@example.com", "wrong").await;
        assert!(matches!(bad, Err(AppError::Unauthorized(_))));

        let unknown = Account::authenticate(&store, "z@example.com", "long-enough-pw").await;
        assert!(matches!(unknown, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn role_claim_only_for_listed_admins() {
        let policy = AdminPolicy::from_parts("ops@example.com", None);
        let mut account = Account {
            id: "u1".into(),
            email: "ops@example.com".into(),
            password_hash: String::new(),
            display_name: None,
            photo_url: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_sign_out_at: None,
        };
        assert_eq!(account.identity(&policy).role_claim, Some(Role::Admin));
        account.email = "admin-lookalike@example.com".into();
        assert_eq!(account.identity(&policy).role_claim, None);
    }
}
