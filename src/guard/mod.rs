//! Role and onboarding routing rules.

pub mod extractor;

use tokio::sync::watch;

use crate::profiles::model::{Role, UserProfile};
use crate::session::SessionState;

/// Well-known paths the guard redirects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardPaths {
    pub login: String,
    pub onboarding: String,
    pub home: String,
    pub admin_prefix: String,
}

impl Default for GuardPaths {
    fn default() -> Self {
        Self {
            login: "/login".into(),
            onboarding: "/onboarding".into(),
            home: "/".into(),
            admin_prefix: "/admin".into(),
        }
    }
}

impl GuardPaths {
    fn is_admin_path(&self, path: &str) -> bool {
        path == self.admin_prefix
            || path
                .strip_prefix(self.admin_prefix.as_str())
                .map_or(false, |rest| rest.starts_with('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// `next` is where to return after signing in.
    Login { next: String },
    Onboarding,
    Home,
}

impl Redirect {
    pub fn location(&self, paths: &GuardPaths) -> String {
        match self {
            Redirect::Login { next } => {
                format!("{}?next={}", paths.login, urlencoding::encode(next))
            }
            Redirect::Onboarding => paths.onboarding.clone(),
            Redirect::Home => paths.home.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session still loading; show a neutral waiting state.
    Pending,
    Allow,
    Redirect(Redirect),
}

/// Decide whether `path` may render for this session.
pub fn evaluate(
    profile: Option<&UserProfile>,
    loading: bool,
    path: &str,
    required: Role,
    paths: &GuardPaths,
) -> GuardDecision {
    if loading {
        return GuardDecision::Pending;
    }
    let Some(profile) = profile else {
        if path == paths.login {
            return GuardDecision::Allow;
        }
        return GuardDecision::Redirect(Redirect::Login {
            next: path.to_string(),
        });
    };
    if !profile.role.satisfies(required) {
        return GuardDecision::Redirect(Redirect::Home);
    }
    if !profile.onboarding_completed
        && required != Role::Admin
        && path != paths.onboarding
        && !paths.is_admin_path(path)
    {
        return GuardDecision::Redirect(Redirect::Onboarding);
    }
    GuardDecision::Allow
}

/// Re-evaluates the guard whenever the session or the current path changes.
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
    path: watch::Receiver<String>,
    required: Role,
    paths: GuardPaths,
}

impl RouteGuard {
    pub fn new(
        session: watch::Receiver<SessionState>,
        path: watch::Receiver<String>,
        required: Role,
        paths: GuardPaths,
    ) -> Self {
        Self {
            session,
            path,
            required,
            paths,
        }
    }

    pub fn current(&mut self) -> GuardDecision {
        let session = self.session.borrow_and_update().clone();
        let path = self.path.borrow_and_update().clone();
        evaluate(
            session.profile.as_ref(),
            session.loading(),
            &path,
            self.required,
            &self.paths,
        )
    }

    /// Wait for the next session or path change and return the new decision.
    /// `None` once both sources are gone.
    pub async fn next(&mut self) -> Option<GuardDecision> {
        tokio::select! {
            r = self.session.changed() => {
                if r.is_err() && self.path.changed().await.is_err() {
                    return None;
                }
            }
            r = self.path.changed() => {
                if r.is_err() && self.session.changed().await.is_err() {
                    return None;
                }
            }
        }
        Some(self.current())
    }
}
