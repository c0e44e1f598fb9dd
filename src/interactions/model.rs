use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::agents::model::InterfaceType;

/// What the user sent: a chat message or the fields of a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputContent {
    Text(String),
    Structured(Map<String, Value>),
}

/// Which side of an interaction a moderation verdict covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeratedField {
    Input,
    Output,
}

impl ModeratedField {
    pub fn as_str(self) -> &'static str {
        match self {
            ModeratedField::Input => "input",
            ModeratedField::Output => "output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(ModeratedField::Input),
            "output" => Some(ModeratedField::Output),
            _ => None,
        }
    }
}

impl fmt::Display for ModeratedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationResult {
    pub is_safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(with = "crate::store::timestamp")]
    pub moderated_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_moderated: Option<ModeratedField>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReviewStatus {
    PendingReview,
    Safe,
    NotSafe,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: String,
    pub user_id: String,
    pub agent_id: String,
    #[serde(with = "crate::store::timestamp")]
    pub timestamp: OffsetDateTime,
    pub input_type: InterfaceType,
    pub input_content: InputContent,
    pub output_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flagged_for_moderation: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moderation_result: Option<ModerationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Interaction {
    pub fn review_status(&self) -> ReviewStatus {
        match &self.moderation_result {
            None => ReviewStatus::PendingReview,
            Some(r) if r.is_safe => ReviewStatus::Safe,
            Some(_) => ReviewStatus::NotSafe,
        }
    }

    pub fn is_flagged(&self) -> bool {
        self.is_flagged_for_moderation.unwrap_or(false)
    }

    /// Text submitted for classification. String input goes raw, structured
    /// input as key-sorted JSON.
    pub fn text_for(&self, field: ModeratedField) -> String {
        match field {
            ModeratedField::Output => self.output_content.clone(),
            ModeratedField::Input => match &self.input_content {
                InputContent::Text(s) => s.clone(),
                InputContent::Structured(map) => {
                    canonicalize(&Value::Object(map.clone())).to_string()
                }
            },
        }
    }
}

/// Rebuild `value` with object keys inserted in sorted order, which fixes
/// the serialized key order under either map backing.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for k in keys {
                out.insert(k.clone(), canonicalize(&map[k]));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
