//! Identity provider backed by the hub's own account records.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::identity::{publish, Identity, IdentityProvider};
use super::repo::Account;
use crate::config::AdminPolicy;
use crate::error::AppError;
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Where the interactive flow gets its credentials. `None` means the user
/// dismissed the prompt.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    async fn prompt(&self) -> Option<Credentials>;
}

pub struct LocalIdentityProvider {
    store: Arc<dyn DocumentStore>,
    policy: AdminPolicy,
    prompt: Arc<dyn CredentialPrompt>,
    current: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        policy: AdminPolicy,
        prompt: Arc<dyn CredentialPrompt>,
    ) -> Self {
        let (current, _rx) = watch::channel(None);
        Self {
            store,
            policy,
            prompt,
            current,
        }
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentityProvider {
    fn identity_events(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }

    #[instrument(skip(self))]
    async fn sign_in_interactive(&self) -> Result<Identity, AppError> {
        let creds = self.prompt.prompt().await.ok_or(AppError::AuthCancelled)?;
        let account = Account::authenticate(self.store.as_ref(), &creds.email, &creds.password)
            .await
            .map_err(|e| match e {
                AppError::Unauthorized(msg) => AppError::AuthProvider(msg),
                other => AppError::AuthProvider(other.to_string()),
            })?;
        let identity = account.identity(&self.policy);
        publish(&self.current, Some(identity.clone()));
        info!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    /// Clears the local identity first, then records the sign-out.
    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AppError> {
        let previous = self.current.borrow().clone();
        publish(&self.current, None);
        let Some(identity) = previous else {
            return Ok(());
        };
        Account::record_sign_out(self.store.as_ref(), &identity.uid)
            .await
            .map_err(|e| {
                warn!(error = %e, uid = %identity.uid, "sign-out bookkeeping failed");
                AppError::AuthProvider(e.to_string())
            })
    }
}
