use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, PgPool};

use super::{as_object, new_id, Document, DocumentStore, Filter, Order, StoreError, StoreResult};

/// Documents live in one JSONB table keyed by `(collection, id)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    db: PgPool,
}

impl PgDocumentStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &PgPool {
        &self.db
    }
}

fn containment(filters: &[Filter]) -> Value {
    let mut map = Map::new();
    for f in filters {
        map.insert(f.field.clone(), f.value.clone());
    }
    Value::Object(map)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> StoreResult<Vec<Document>> {
        let sql = match order {
            None => {
                r#"
                SELECT id, data
                FROM documents
                WHERE collection = $1 AND data @> $2
                ORDER BY created_at ASC
                "#
            }
            Some(o) if o.descending => {
                r#"
                SELECT id, data
                FROM documents
                WHERE collection = $1 AND data @> $2
                ORDER BY data -> $3 DESC NULLS LAST, created_at DESC
                "#
            }
            Some(_) => {
                r#"
                SELECT id, data
                FROM documents
                WHERE collection = $1 AND data @> $2
                ORDER BY data -> $3 ASC NULLS FIRST, created_at ASC
                "#
            }
        };

        let mut query = sqlx::query_as::<_, (String, Value)>(sql)
            .bind(collection)
            .bind(containment(filters));
        if let Some(o) = order {
            query = query.bind(o.field.clone());
        }
        let rows = query.fetch_all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(|(id, data)| Document { id, data })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT id, data
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(|(id, data)| Document { id, data }))
    }

    async fn create(&self, collection: &str, data: Value) -> StoreResult<String> {
        let data = Value::Object(as_object(data)?);
        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(data)
        .execute(&self.db)
        .await?;
        Ok(id)
    }

    async fn put(&self, collection: &str, id: &str, data: Value) -> StoreResult<()> {
        let data = Value::Object(as_object(data)?);
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(data)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> StoreResult<()> {
        let patch = Value::Object(as_object(patch)?);
        let result = sqlx::query(
            r#"
            UPDATE documents
               SET data = data || $3, updated_at = now()
             WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(patch)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM documents
             WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filters_fold_into_one_containment_object() {
        let value = containment(&[
            Filter::eq("status", "published"),
            Filter::eq("isFlaggedForModeration", true),
        ]);
        assert_eq!(
            value,
            json!({ "status": "published", "isFlaggedForModeration": true })
        );
        assert_eq!(containment(&[]), json!({}));
    }
}
