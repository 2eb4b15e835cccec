use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ryde_shared::UserProfile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Entity collections owned by the external managed platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Ride,
    Booking,
    Reservation,
    SharedCab,
    Payment,
    Offer,
    Sos,
    LocationPing,
    Community,
    Vehicle,
    User,
}

/// An opaque record as returned by the platform. The core only interprets
/// the fields it owns; everything else rides along untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub fields: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    /// Deserialize the record payload into a typed model.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.fields.clone())
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

/// Sort key in the platform's convention: a leading `-` means descending,
/// e.g. `-start_time`.
#[derive(Debug, Clone)]
pub struct Sort(pub String);

impl Sort {
    pub fn field(&self) -> &str {
        self.0.strip_prefix('-').unwrap_or(&self.0)
    }

    pub fn descending(&self) -> bool {
        self.0.starts_with('-')
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("External store unavailable: {0}")]
    Unavailable(String),

    #[error("Record serialization failed: {0}")]
    Serialization(String),
}

/// Call/response contract against the external entity platform.
/// Predicates are JSON objects matched by field equality, mirroring the
/// platform's `filter({status: "open"}, "-start_time", 20)` shape.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create(&self, kind: EntityKind, fields: serde_json::Value)
        -> Result<Record, StoreError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: Uuid,
        fields: serde_json::Value,
    ) -> Result<Record, StoreError>;

    async fn get(&self, kind: EntityKind, id: Uuid) -> Result<Record, StoreError>;

    async fn filter(
        &self,
        kind: EntityKind,
        predicate: serde_json::Value,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError>;

    async fn list(
        &self,
        kind: EntityKind,
        sort: Option<Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<Record>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No authenticated user")]
    Unauthenticated,
}

/// Identity provider seam. The real platform redirects to its own login;
/// the core only ever asks who the current user is.
#[async_trait]
pub trait Auth: Send + Sync {
    async fn current_user(&self) -> Result<UserProfile, AuthError>;
}
