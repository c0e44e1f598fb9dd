use serde_json::{json, Map, Value};
use super::model::{ExperienceLevel, Role, UserProfile};
use crate::store::{encode, timestamp, DocumentStore, Order, StoreResult, PROFILES};

const ID_FIELD: &str = "uid";

pub async fn find(store: &dyn DocumentStore, uid: &str) -> StoreResult<Option<UserProfile>> {
    match store.get(PROFILES, uid).await? {
        Some(doc) => Ok(Some(doc.decode(ID_FIELD)?)),
        None => Ok(None),
    }
}

pub async fn save(store: &dyn DocumentStore, profile: &UserProfile) -> StoreResult<()> {
    store
        .put(PROFILES, &profile.uid, encode(profile, ID_FIELD)?)
        .await
}

pub async fn list(store: &dyn DocumentStore) -> StoreResult<Vec<UserProfile>> {
    store
        .list(PROFILES, &[], Some(&Order::desc("createdAt")))
        .await?
        .into_iter()
        .map(|d| d.decode(ID_FIELD))
        .collect()
}

/// Onboarding answers; `None` leaves the optional company fields untouched.
#[derive(Debug, Clone, Default)]
pub struct CompanyDetails {
    pub company_name: Option<String>,
    pub company_size: Option<String>,
    pub industry: Option<String>,
}

pub async fn mark_onboarded(
    store: &dyn DocumentStore,
    uid: &str,
    user_goal: Option<String>,
    experience_level: Option<ExperienceLevel>,
) -> StoreResult<()> {
    complete_onboarding(
        store,
        uid,
        user_goal,
        experience_level,
        CompanyDetails::default(),
    )
    .await
}

pub async fn complete_onboarding(
    store: &dyn DocumentStore,
    uid: &str,
    user_goal: Option<String>,
    experience_level: Option<ExperienceLevel>,
    company: CompanyDetails,
) -> StoreResult<()> {
    let mut patch = Map::new();
    patch.insert("onboardingCompleted".into(), Value::Bool(true));
    patch.insert("updatedAt".into(), Value::String(timestamp::now()?));
    if let Some(goal) = user_goal {
        patch.insert("userGoal".into(), Value::String(goal));
    }
    if let Some(level) = experience_level {
        patch.insert("experienceLevel".into(), json!(level));
    }
    for (key, value) in [
        ("companyName", company.company_name),
        ("companySize", company.company_size),
        ("industry", company.industry),
    ] {
        if let Some(v) = value {
            patch.insert(key.into(), Value::String(v));
        }
    }
    store.update(PROFILES, uid, Value::Object(patch)).await
}

/// Fields an administrator may change on someone else's profile.
#[derive(Debug, Clone, Default)]
pub struct AdminEdit {
    pub role: Option<Role>,
    pub onboarding_completed: Option<bool>,
    pub display_name: Option<String>,
}

pub async fn apply_admin_edit(
    store: &dyn DocumentStore,
    uid: &str,
    edit: &AdminEdit,
) -> StoreResult<()> {
    let mut patch = Map::new();
    patch.insert("updatedAt".into(), Value::String(timestamp::now()?));
    if let Some(role) = edit.role {
        patch.insert("role".into(), json!(role));
    }
    if let Some(done) = edit.onboarding_completed {
        patch.insert("onboardingCompleted".into(), Value::Bool(done));
    }
    if let Some(name) = &edit.display_name {
        patch.insert("displayName".into(), Value::String(name.clone()));
    }
    store.update(PROFILES, uid, Value::Object(patch)).await
}

pub async fn touch_last_login(store: &dyn DocumentStore, uid: &str) -> StoreResult<()> {
    store
        .update(PROFILES, uid, json!({ "lastLoginAt": timestamp::now()? }))
        .await
}
