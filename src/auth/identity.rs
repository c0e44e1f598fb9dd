//! The identity provider seam.
//!
//! Providers publish the current identity on a `watch` channel. Consumers
//! either hold the receiver directly or register a callback with
//! [`on_identity_changed`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{sync::watch, task::JoinHandle};
use tracing::debug;

use crate::error::AppError;
use crate::profiles::model::Role;

/// Who the provider says is signed in. Read-only for the rest of the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Role asserted by the identity layer itself, when it issues one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_claim: Option<Role>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current identity (`None` when signed out) plus every later transition.
    fn identity_events(&self) -> watch::Receiver<Option<Identity>>;

    /// Run the interactive sign-in flow.
    ///
    /// Fails with `AppError::AuthCancelled` when the flow is dismissed and
    /// `AppError::AuthProvider` for provider-side failures.
    async fn sign_in_interactive(&self) -> Result<Identity, AppError>;

    /// Clear the signed-in identity. Local state is cleared even when the
    /// provider's remote bookkeeping fails.
    async fn sign_out(&self) -> Result<(), AppError>;
}

/// Handle for a callback registered with [`on_identity_changed`].
/// Dropping it stops delivery as well.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Deliver the current identity, then each change, to `callback`.
///
/// Consecutive equal values are delivered once. Delivery follows the latest
/// value, not every transition: changes that land before the callback runs
/// collapse into the newest identity, so a quick A, None, A is seen as A
/// alone. Callers needing a full transition log should not rely on this.
pub fn on_identity_changed<F>(provider: &dyn IdentityProvider, mut callback: F) -> Subscription
where
    F: FnMut(Option<Identity>) + Send + 'static,
{
    let mut rx = provider.identity_events();
    let handle = tokio::spawn(async move {
        let mut last = rx.borrow_and_update().clone();
        callback(last.clone());
        while rx.changed().await.is_ok() {
            let next = rx.borrow_and_update().clone();
            if next == last {
                debug!("identity unchanged; notification skipped");
                continue;
            }
            last = next.clone();
            callback(next);
        }
    });
    Subscription { handle }
}

/// Publish `next` unless it equals what is already there.
pub(crate) fn publish(tx: &watch::Sender<Option<Identity>>, next: Option<Identity>) -> bool {
    tx.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    })
}


#[cfg(test)]
mod tests {
    use super::testing::{identity, ScriptedProvider};
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn callback_sees_current_value_then_changes() {
        let provider = ScriptedProvider::new(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = on_identity_changed(&provider, move |id| {
            sink.lock().unwrap().push(id.map(|i| i.uid));
        });
        settle().await;

        provider.emit(Some(identity("u1", None)));
        settle().await;
        provider.emit(None);
        settle().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("u1".to_string()), None]
        );
    }

    #[tokio::test]
    async fn same_identity_is_not_delivered_twice() {
        let provider = ScriptedProvider::new(Some(identity("u1", None)));
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let _sub = on_identity_changed(&provider, move |_| {
            *sink.lock().unwrap() += 1;
        });
        settle().await;

        provider.emit(Some(identity("u1", None)));
        // bypass the provider's own dedupe to prove the subscriber dedupes too
        provider.tx.send_replace(Some(identity("u1", None)));
        settle().await;

        assert_eq!(*count.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn rapid_changes_collapse_to_the_latest() {
        let provider = ScriptedProvider::new(Some(identity("u1", None)));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = on_identity_changed(&provider, move |id| {
            sink.lock().unwrap().push(id.map(|i| i.uid));
        });
        settle().await;

        provider.emit(None);
        provider.emit(Some(identity("u1", None)));
        settle().await;
        provider.emit(None);
        provider.emit(Some(identity("u2", None)));
        settle().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Some("u1".to_string()), Some("u2".to_string())]
        );
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let provider = ScriptedProvider::new(None);
        let count = Arc::new(Mutex::new(0));
        let sink = count.clone();
        let sub = on_identity_changed(&provider, move |_| {
            *sink.lock().unwrap() += 1;
        });
        settle().await;
        sub.unsubscribe();

        provider.emit(Some(identity("u2", None)));
        settle().await;
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
