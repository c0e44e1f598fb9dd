use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::Value;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tokio::sync::RwLock;

use super::{as_object, new_id, Document, DocumentStore, Filter, Order, StoreError, StoreResult};

/// In-process store used by tests and by local runs without `DATABASE_URL`.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, AtomicOrdering::SeqCst);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(AtomicOrdering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }
}

fn matches(data: &Value, filters: &[Filter]) -> bool {
    filters
        .iter()
        .all(|f| data.get(&f.field).map_or(false, |v| *v == f.value))
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // timestamps compare as instants, everything else lexically
            match (
                OffsetDateTime::parse(x, &Rfc3339),
                OffsetDateTime::parse(y, &Rfc3339),
            ) {
                (Ok(tx), Ok(ty)) => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> StoreResult<Vec<Document>> {
        self.check_online()?;
        let guard = self.collections.read().await;
        let mut docs: Vec<Document> = guard
            .get(collection)
            .map(|c| {
                c.iter()
                    .filter(|(_, data)| matches(data, filters))
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            docs.sort_by(|a, b| {
                let ord = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        self.check_online()?;
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|data| Document {
                id: id.to_string(),
                data: data.clone(),
            }))
    }

    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        self.check_online()?;
        let data = Value::Object(as_object(data)?);
        let id = new_id();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), data);
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        self.check_online()?;
        let data = Value::Object(as_object(data)?);
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()> {
        self.check_online()?;
        let patch = as_object(patch)?;
        let mut guard = self.collections.write().await;
        let stored = guard
            .get_mut(collection)
            .and_then(|c| c.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;
        let Value::Object(body) = stored else {
            return Err(StoreError::NotAnObject);
        };
        for (key, value) in patch {
            body.insert(key, value);
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.check_online()?;
        let removed = self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|c| c.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = MemoryDocumentStore::new();
        store
            .create("agents", json!({ "name": "b", "status": "published" }))
            .await
            .unwrap();
        store
            .create("agents", json!({ "name": "a", "status": "published" }))
            .await
            .unwrap();
        store
            .create("agents", json!({ "name": "c", "status": "draft" }))
            .await
            .unwrap();

        let docs = store
            .list(
                "agents",
                &[Filter::eq("status", "published")],
                Some(&Order::asc("name")),
            )
            .await
            .unwrap();
        let names: Vec<_> = docs.iter().map(|d| d.data["name"].clone()).collect();
        assert_eq!(names, vec![json!("a"), json!("b")]);
    }

    #[tokio::test]
    async fn timestamps_order_as_instants() {
        let store = MemoryDocumentStore::new();
        store
            .put("i", "whole", json!({ "timestamp": "2024-01-01T00:00:01Z" }))
            .await
            .unwrap();
        store
            .put("i", "fraction", json!({ "timestamp": "2024-01-01T00:00:00.5Z" }))
            .await
            .unwrap();

        let docs = store
            .list("i", &[], Some(&Order::desc("timestamp")))
            .await
            .unwrap();
        assert_eq!(docs[0].id, "whole");
        assert_eq!(docs[1].id, "fraction");
    }

    #[tokio::test]
    async fn update_replaces_top_level_keys_only() {
        let store = MemoryDocumentStore::new();
        store
            .put("c", "1", json!({ "a": { "x": 1, "y": 2 }, "b": true }))
            .await
            .unwrap();
        store.update("c", "1", json!({ "a": { "z": 3 } })).await.unwrap();

        let doc = store.get("c", "1").await.unwrap().unwrap();
        assert_eq!(doc.data, json!({ "a": { "z": 3 }, "b": true }));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_records() {
        let store = MemoryDocumentStore::new();
        assert!(matches!(
            store.update("c", "nope", json!({})).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("c", "nope").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn offline_store_fails_every_call() {
        let store = MemoryDocumentStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("c", "1").await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.get("c", "1").await.unwrap().is_none());
    }
}
