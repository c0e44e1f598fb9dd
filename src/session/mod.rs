//! Process-wide session state: who is signed in and which profile they carry.
//!
//! A [`SessionContext`] listens to an [`IdentityProvider`], resolves each new
//! identity into a profile and publishes [`SessionState`] snapshots on a
//! `watch` channel. Identity events supersede each other: a resolution whose
//! event is no longer the latest is dropped when it finishes.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::auth::identity::{on_identity_changed, Identity, IdentityProvider, Subscription};
use crate::error::AppError;
use crate::profiles::{dto::OnboardingForm, model::UserProfile, resolver::ProfileResolver, services};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No identity event seen yet.
    Initializing,
    /// Identity known, profile on its way.
    Resolving,
    Ready,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    pub profile: Option<UserProfile>,
}

impl SessionState {
    pub fn initializing() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            identity: None,
            profile: None,
        }
    }

    fn resolving(identity: Identity) -> Self {
        Self {
            phase: SessionPhase::Resolving,
            identity: Some(identity),
            profile: None,
        }
    }

    fn ready(identity: Option<Identity>, profile: Option<UserProfile>) -> Self {
        Self {
            phase: SessionPhase::Ready,
            identity,
            profile,
        }
    }

    pub fn loading(&self) -> bool {
        self.phase != SessionPhase::Ready
    }

    pub fn is_admin(&self) -> bool {
        self.profile.as_ref().map_or(false, UserProfile::is_admin)
    }

    pub fn is_signed_out(&self) -> bool {
        self.phase == SessionPhase::Ready && self.profile.is_none()
    }
}

struct Inner {
    provider: Arc<dyn IdentityProvider>,
    resolver: ProfileResolver,
    state: watch::Sender<SessionState>,
    generation: AtomicU64,
    subscription: Mutex<Option<Subscription>>,
}

impl Inner {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Publish `next` if `generation` is still the latest identity event.
    fn apply(&self, generation: u64, next: SessionState) -> bool {
        self.state.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                debug!(generation, "stale session update discarded");
                return false;
            }
            if *current == next {
                return false;
            }
            *current = next;
            true
        })
    }

    fn on_identity(self: &Arc<Self>, identity: Option<Identity>) {
        let generation = self.next_generation();
        match identity {
            None => {
                debug!(generation, "identity cleared");
                self.apply(generation, SessionState::ready(None, None));
            }
            Some(identity) => {
                debug!(generation, uid = %identity.uid, "identity changed; resolving profile");
                self.apply(generation, SessionState::resolving(identity.clone()));
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    let profile = inner.resolver.resolve(&identity).await;
                    if inner.apply(generation, SessionState::ready(Some(identity), Some(profile))) {
                        info!(generation, "session ready");
                    }
                });
            }
        }
    }
}

/// Injectable session holder. Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

impl SessionContext {
    /// Create the context and start listening to `provider`.
    pub fn start(provider: Arc<dyn IdentityProvider>, resolver: ProfileResolver) -> Self {
        let (state, _rx) = watch::channel(SessionState::initializing());
        let inner = Arc::new(Inner {
            provider,
            resolver,
            state,
            generation: AtomicU64::new(0),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&inner);
        let subscription = on_identity_changed(inner.provider.as_ref(), move |identity| {
            if let Some(inner) = weak.upgrade() {
                inner.on_identity(identity);
            }
        });
        if let Ok(mut slot) = inner.subscription.lock() {
            *slot = Some(subscription);
        }

        Self { inner }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Observe every published state; the receiver starts at the current one.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.borrow().is_admin()
    }

    /// Wait until the session leaves its loading phases.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.subscribe();
        let state = match rx.wait_for(|s| !s.loading()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Run the provider's interactive sign-in. On failure the session is untouched.
    pub async fn sign_in(&self) -> Result<Identity, AppError> {
        match self.inner.provider.sign_in_interactive().await {
            Ok(identity) => Ok(identity),
            Err(e) => {
                warn!(error = %e, "sign-in failed");
                Err(e)
            }
        }
    }

    /// Sign out and return once the signed-out state has been published.
    ///
    /// Provider failures are logged; the local session is cleared regardless.
    pub async fn sign_out(&self) {
        if let Err(e) = self.inner.provider.sign_out().await {
            warn!(error = %e, "provider sign-out failed; clearing local session anyway");
        }
        let generation = self.inner.next_generation();
        self.inner.apply(generation, SessionState::ready(None, None));

        let mut rx = self.subscribe();
        if rx.wait_for(SessionState::is_signed_out).await.is_err() {
            warn!("session channel closed during sign-out");
        }
        info!("signed out");
    }

    /// Replace the session profile after an explicit profile update.
    /// Ignored unless it belongs to the identity currently signed in.
    pub fn apply_profile(&self, profile: UserProfile) -> bool {
        self.inner.state.send_if_modified(|current| {
            let owns = current.phase == SessionPhase::Ready
                && current
                    .identity
                    .as_ref()
                    .map_or(false, |i| i.uid == profile.uid);
            if !owns || current.profile.as_ref() == Some(&profile) {
                return false;
            }
            current.profile = Some(profile);
            true
        })
    }

    /// Finish onboarding for the signed-in user and publish the new profile.
    pub async fn complete_onboarding(&self, form: OnboardingForm) -> Result<UserProfile, AppError> {
        let uid = self
            .state()
            .profile
            .map(|p| p.uid)
            .ok_or_else(|| AppError::Unauthorized("no signed-in user".into()))?;
        let updated =
            services::complete_onboarding(self.inner.resolver.store().as_ref(), &uid, form).await?;
        self.apply_profile(updated.clone());
        Ok(updated)
    }
}
