//! In-memory implementation of the external platform contracts. The real
//! platform is opaque; this keeps the same create/update/filter/list shape so
//! the engine and its tests run against in-process state.

use async_trait::async_trait;
use chrono::Utc;
use ryde_core::store::{Auth, AuthError, EntityKind, EntityStore, Record, Sort, StoreError};
use ryde_shared::UserProfile;
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

pub struct InMemoryStore {
    collections: RwLock<HashMap<EntityKind, HashMap<Uuid, Record>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    fn matches(record: &Record, predicate: &serde_json::Value) -> bool {
        match predicate.as_object() {
            Some(obj) => obj
                .iter()
                .all(|(k, v)| record.fields.get(k) == Some(v)),
            None => true,
        }
    }

    fn compare_values(a: &serde_json::Value, b: &serde_json::Value) -> Ordering {
        match (a, b) {
            (serde_json::Value::Number(x), serde_json::Value::Number(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            (serde_json::Value::String(x), serde_json::Value::String(y)) => x.cmp(y),
            _ => Ordering::Equal,
        }
    }

    fn apply_sort_limit(
        mut records: Vec<Record>,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Vec<Record> {
        if let Some(sort) = sort {
            let field = sort.field().to_string();
            records.sort_by(|a, b| {
                let av = a.fields.get(&field).unwrap_or(&serde_json::Value::Null);
                let bv = b.fields.get(&field).unwrap_or(&serde_json::Value::Null);
                Self::compare_values(av, bv)
            });
            if sort.descending() {
                records.reverse();
            }
        }
        if let Some(limit) = limit {
            records.truncate(limit);
        }
        records
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn create(
        &self,
        kind: EntityKind,
        fields: serde_json::Value,
    ) -> Result<Record, StoreError> {
        // Honor an id already minted by the caller's model so later lookups
        // by model id find the record.
        let id = fields
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::new_v4);

        let now = Utc::now();
        let record = Record {
            id,
            fields,
            created_at: now,
            updated_at: now,
        };
        let mut collections = self.collections.write().await;
        collections
            .entry(kind)
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: Uuid,
        fields: serde_json::Value,
    ) -> Result<Record, StoreError> {
        let mut collections = self.collections.write().await;
        let record = collections
            .entry(kind)
            .or_default()
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if let (Some(existing), Some(patch)) = (record.fields.as_object_mut(), fields.as_object())
        {
            for (k, v) in patch {
                existing.insert(k.clone(), v.clone());
            }
        } else {
            record.fields = fields;
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Record, StoreError> {
        let collections = self.collections.read().await;
        collections
            .get(&kind)
            .and_then(|c| c.get(&id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn filter(
        &self,
        kind: EntityKind,
        predicate: serde_json::Value,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        let collections = self.collections.read().await;
        let records = collections
            .get(&kind)
            .map(|c| {
                c.values()
                    .filter(|r| Self::matches(r, &predicate))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self::apply_sort_limit(records, sort, limit))
    }

    async fn list(
        &self,
        kind: EntityKind,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError> {
        self.filter(kind, serde_json::json!({}), sort, limit).await
    }
}

/// Fixed-identity auth provider for tests and single-user tooling.
pub struct StaticAuth {
    user: Option<UserProfile>,
}

impl StaticAuth {
    pub fn new(user: UserProfile) -> Self {
        Self { user: Some(user) }
    }

    pub fn unauthenticated() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl Auth for StaticAuth {
    async fn current_user(&self) -> Result<UserProfile, AuthError> {
        self.user.clone().ok_or(AuthError::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_keeps_model_id() {
        let store = InMemoryStore::new();
        let id = Uuid::new_v4();
        let record = store
            .create(
                EntityKind::Ride,
                serde_json::json!({ "id": id.to_string(), "status": "SCHEDULED" }),
            )
            .await
            .unwrap();
        assert_eq!(record.id, id);
        assert_eq!(store.get(EntityKind::Ride, id).await.unwrap().id, id);
    }

    #[tokio::test]
    async fn test_update_merges_fields() {
        let store = InMemoryStore::new();
        let record = store
            .create(
                EntityKind::Ride,
                serde_json::json!({ "seats_available": 3, "status": "SCHEDULED" }),
            )
            .await
            .unwrap();

        let updated = store
            .update(
                EntityKind::Ride,
                record.id,
                serde_json::json!({ "seats_available": 2 }),
            )
            .await
            .unwrap();
        assert_eq!(updated.fields["seats_available"], 2);
        assert_eq!(updated.fields["status"], "SCHEDULED");

        assert!(matches!(
            store
                .update(EntityKind::Ride, Uuid::new_v4(), serde_json::json!({}))
                .await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_filter_sort_limit() {
        let store = InMemoryStore::new();
        for (price, status) in [(100, "OPEN"), (300, "OPEN"), (200, "CANCELLED")] {
            store
                .create(
                    EntityKind::SharedCab,
                    serde_json::json!({ "total_cab_fare_cents": price, "status": status }),
                )
                .await
                .unwrap();
        }

        let open = store
            .filter(
                EntityKind::SharedCab,
                serde_json::json!({ "status": "OPEN" }),
                Some(Sort("-total_cab_fare_cents".to_string())),
                Some(1),
            )
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].fields["total_cab_fare_cents"], 300);

        let all = store.list(EntityKind::SharedCab, None, None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_static_auth() {
        let auth = StaticAuth::unauthenticated();
        assert!(matches!(
            auth.current_user().await,
            Err(AuthError::Unauthenticated)
        ));
    }
}
