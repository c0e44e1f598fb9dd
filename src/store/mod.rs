use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

mod memory;
mod postgres;
pub mod timestamp;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

pub const ACCOUNTS: &str = "accounts";
pub const PROFILES: &str = "users";
pub const AGENTS: &str = "agents";
pub const INTERACTIONS: &str = "interactions";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{collection}/{id} not found")]
    NotFound { collection: String, id: String },
    #[error("document is not a JSON object")]
    NotAnObject,
    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A stored record: its id plus the JSON body (the id is not repeated in `data`).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// Equality filter on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Collection-style document store.
///
/// `update` merges the top-level keys of `patch` into the stored object, so
/// a key present in the patch replaces the stored value wholesale.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> StoreResult<Vec<Document>>;
    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>>;
    async fn create(&self, collection: &str, data: Value) -> StoreResult<String>;
    async fn put(&self, collection: &str, id: &str, data: Value) -> StoreResult<()>;
    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()>;
    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

impl Document {
    /// Deserialize into a record type that carries its own `id` field.
    pub fn decode<T: DeserializeOwned>(self, id_field: &str) -> StoreResult<T> {
        let mut body = match self.data {
            Value::Object(map) => map,
            _ => return Err(StoreError::NotAnObject),
        };
        body.insert(id_field.to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(body))?)
    }
}

/// Serialize a record and strip its id field, which the store keys on.
pub fn encode<T: Serialize>(record: &T, id_field: &str) -> StoreResult<Value> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove(id_field);
            Ok(Value::Object(map))
        }
        _ => Err(StoreError::NotAnObject),
    }
}

pub(crate) fn as_object(value: Value) -> StoreResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
