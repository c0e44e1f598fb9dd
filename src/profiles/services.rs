use tracing::{info, instrument};

use super::dto::OnboardingForm;
use super::model::UserProfile;
use super::repo::{self, AdminEdit};
use crate::error::AppError;
use crate::store::DocumentStore;

async fn reload(store: &dyn DocumentStore, uid: &str) -> Result<UserProfile, AppError> {
    repo::find(store, uid)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("profile {uid}")))
}

#[instrument(skip(store, form))]
pub async fn complete_onboarding(
    store: &dyn DocumentStore,
    uid: &str,
    form: OnboardingForm,
) -> Result<UserProfile, AppError> {
    repo::complete_onboarding(
        store,
        uid,
        Some(form.user_goal),
        Some(form.experience_level),
        form.company,
    )
    .await?;
    info!(uid, "onboarding completed");
    reload(store, uid).await
}

#[instrument(skip(store, edit))]
pub async fn admin_update(
    store: &dyn DocumentStore,
    uid: &str,
    edit: &AdminEdit,
) -> Result<UserProfile, AppError> {
    repo::apply_admin_edit(store, uid, edit).await?;
    info!(uid, role = ?edit.role, "profile edited by admin");
    reload(store, uid).await
}

pub async fn list_users(store: &dyn DocumentStore) -> Result<Vec<UserProfile>, AppError> {
    Ok(repo::list(store).await?)
}
