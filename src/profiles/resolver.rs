use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};

use super::model::{Role, UserProfile};
use super::repo;
use crate::auth::identity::Identity;
use crate::config::AdminPolicy;
use crate::store::DocumentStore;

/// Consecutive degraded resolutions before the condition is logged as an error.
const DEGRADED_ESCALATION: u32 = 3;

/// Maps an identity to its application profile, creating one on first sight.
#[derive(Clone)]
pub struct ProfileResolver {
    store: Arc<dyn DocumentStore>,
    policy: AdminPolicy,
    degraded_streak: Arc<AtomicU32>,
}

impl ProfileResolver {
    pub fn new(store: Arc<dyn DocumentStore>, policy: AdminPolicy) -> Self {
        Self {
            store,
            policy,
            degraded_streak: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Never fails: store trouble degrades to the synthesized default profile.
    #[instrument(skip(self, identity), fields(uid = %identity.uid))]
    pub async fn resolve(&self, identity: &Identity) -> UserProfile {
        match repo::find(self.store.as_ref(), &identity.uid).await {
            Ok(Some(stored)) => {
                self.degraded_streak.store(0, Ordering::Relaxed);
                debug!("profile found");
                let claimed = identity.role_claim.filter(|role| *role != stored.role);
                let profile = refresh_from_identity(stored, identity);
                if let Some(role) = claimed {
                    if let Err(e) = repo::save(self.store.as_ref(), &profile).await {
                        warn!(error = %e, "could not persist claimed role");
                    } else {
                        info!(role = role.as_str(), "stored role replaced by identity claim");
                    }
                }
                profile
            }
            Ok(None) => {
                self.degraded_streak.store(0, Ordering::Relaxed);
                let profile = synthesize(identity, &self.policy, OffsetDateTime::now_utc());
                if let Err(e) = repo::save(self.store.as_ref(), &profile).await {
                    warn!(error = %e, "could not persist new profile; serving it unsaved");
                } else {
                    info!(role = profile.role.as_str(), "profile created");
                }
                profile
            }
            Err(e) => {
                let streak = self.degraded_streak.fetch_add(1, Ordering::Relaxed) + 1;
                if streak >= DEGRADED_ESCALATION {
                    error!(error = %e, streak, "profile resolution degraded repeatedly");
                } else {
                    warn!(error = %e, "profile resolution degraded; using default profile");
                }
                synthesize(identity, &self.policy, OffsetDateTime::now_utc())
            }
        }
    }
}

/// Default profile for an identity nobody has stored yet.
///
/// The identity's own role claim wins; otherwise the development marker (if
/// configured) may grant admin. Admins skip onboarding.
pub fn synthesize(identity: &Identity, policy: &AdminPolicy, now: OffsetDateTime) -> UserProfile {
    let role = identity.role_claim.unwrap_or_else(|| {
        if policy.matches_dev_marker(identity.email.as_deref()) {
            Role::Admin
        } else {
            Role::Client
        }
    });

    let display_name = identity
        .display_name
        .clone()
        .unwrap_or_else(|| format!("User {}", identity.uid.chars().take(5).collect::<String>()));
    let initial = identity
        .display_name
        .as_deref()
        .and_then(|n| n.chars().next())
        .unwrap_or('U');
    let photo_url = identity
        .photo_url
        .clone()
        .unwrap_or_else(|| format!("https://placehold.co/100x100.png?text={initial}"));

    UserProfile {
        uid: identity.uid.clone(),
        email: identity.email.clone(),
        display_name: Some(display_name),
        photo_url: Some(photo_url),
        role,
        onboarding_completed: role == Role::Admin,
        user_goal: None,
        experience_level: None,
        company_name: None,
        company_size: None,
        industry: None,
        created_at: now,
        updated_at: now,
        last_login_at: None,
    }
}

/// Stored profile updated with what the identity currently says. A role claim
/// replaces the stored role; admins never wait on onboarding.
fn refresh_from_identity(mut profile: UserProfile, identity: &Identity) -> UserProfile {
    profile.uid = identity.uid.clone();
    if let Some(role) = identity.role_claim {
        profile.role = role;
        if role == Role::Admin {
            profile.onboarding_completed = true;
        }
    }
    profile.email = identity.email.clone();
    if identity.display_name.is_some() {
        profile.display_name = identity.display_name.clone();
    }
    if identity.photo_url.is_some() {
        profile.photo_url = identity.photo_url.clone();
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::testing::identity;
    use crate::store::{MemoryDocumentStore, PROFILES};

    fn dev_policy() -> AdminPolicy {
        AdminPolicy::from_parts("", Some("admin@example.com".into()))
    }

    #[test]
    fn marker_email_synthesizes_admin() {
        let id = identity("u-admin", Some("admin@example.com"));
        let profile = synthesize(&id, &dev_policy(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(profile.role, Role::Admin);
        assert!(profile.onboarding_completed);
    }

    #[test]
    fn other_identities_synthesize_client() {
        for id in [
            identity("u1", Some("client@example.com")),
            identity("u2", None),
        ] {
            let profile = synthesize(&id, &dev_policy(), OffsetDateTime::UNIX_EPOCH);
            assert_eq!(profile.role, Role::Client);
            assert!(!profile.onboarding_completed);
        }
    }

    #[test]
    fn marker_is_ignored_without_configuration() {
        let id = identity("u1", Some("admin@example.com"));
        let profile = synthesize(&id, &AdminPolicy::default(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(profile.role, Role::Client);
    }

    #[test]
    fn role_claim_wins_over_marker() {
        let mut id = identity("u1", Some("admin@example.com"));
        id.role_claim = Some(Role::Creator);
        let profile = synthesize(&id, &dev_policy(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(profile.role, Role::Creator);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let id = identity("abcdefgh", None);
        let a = synthesize(&id, &dev_policy(), OffsetDateTime::UNIX_EPOCH);
        let b = synthesize(&id, &dev_policy(), OffsetDateTime::UNIX_EPOCH);
        assert_eq!(a, b);
        assert_eq!(a.display_name.as_deref(), Some("User abcde"));
        assert_eq!(
            a.photo_url.as_deref(),
            Some("https://placehold.co/100x100.png?text=U")
        );
    }

    #[tokio::test]
    async fn first_resolution_persists_profile() {
        let store = Arc::new(MemoryDocumentStore::new());
        let resolver = ProfileResolver::new(store.clone(), AdminPolicy::default());
        let id = identity("u1", Some("c@example.com"));

        let profile = resolver.resolve(&id).await;
        assert_eq!(profile.uid, "u1");
        assert!(store.get(PROFILES, "u1").await.unwrap().is_some());

        // later resolutions read the stored record
        repo::mark_onboarded(store.as_ref(), "u1", Some("grow".into()), None)
            .await
            .unwrap();
        let again = resolver.resolve(&id).await;
        assert!(again.onboarding_completed);
    }

    #[tokio::test]
    async fn later_admin_claim_promotes_stored_client() {
        let store = Arc::new(MemoryDocumentStore::new());
        let resolver = ProfileResolver::new(store.clone(), AdminPolicy::default());
        let mut id = identity("u1", Some("ops@example.com"));

        let first = resolver.resolve(&id).await;
        assert_eq!(first.role, Role::Client);
        assert!(!first.onboarding_completed);

        // address added to the admin list after the profile was created
        id.role_claim = Some(Role::Admin);
        let promoted = resolver.resolve(&id).await;
        assert_eq!(promoted.role, Role::Admin);
        assert!(promoted.onboarding_completed);

        let stored = repo::find(store.as_ref(), "u1").await.unwrap().unwrap();
        assert_eq!(stored.role, Role::Admin);
        assert!(stored.onboarding_completed);
    }

    #[tokio::test]
    async fn missing_claim_keeps_stored_role() {
        let store = Arc::new(MemoryDocumentStore::new());
        let resolver = ProfileResolver::new(store.clone(), AdminPolicy::default());
        let id = identity("u1", None);
        let mut profile = resolver.resolve(&id).await;
        profile.role = Role::Creator;
        repo::save(store.as_ref(), &profile).await.unwrap();

        assert_eq!(resolver.resolve(&id).await.role, Role::Creator);
    }

    #[tokio::test]
    async fn store_outage_degrades_to_default() {
        let store = Arc::new(MemoryDocumentStore::new());
        store.set_offline(true);
        let resolver = ProfileResolver::new(store.clone(), dev_policy());

        let profile = resolver
            .resolve(&identity("u9", Some("admin@example.com")))
            .await;
        assert_eq!(profile.uid, "u9");
        assert_eq!(profile.role, Role::Admin);

        store.set_offline(false);
        assert!(store.get(PROFILES, "u9").await.unwrap().is_none());
    }
}
