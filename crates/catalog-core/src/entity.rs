//! Entity base shared by every persisted domain type.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;

/// Identity and audit timestamps carried by every entity.
///
/// The id and creation time are fixed at construction; there is no setter
/// for either. Only [`EntityMeta::mark_updated`] changes this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityMeta {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl EntityMeta {
    /// Creates metadata for a brand-new entity.
    #[must_use]
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: clock.now(),
            updated_at: None,
        }
    }

    /// Returns the entity identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns when the entity was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the entity was last updated, if ever.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Records a mutation at `at`.
    pub fn mark_updated(&mut self, at: DateTime<Utc>) {
        self.updated_at = Some(at);
    }
}

/// A persisted domain type.
///
/// Entities round-trip through their serde representation: the store keeps
/// the JSON snapshot and repositories rebuild entities from it. Implementors
/// that carry invariants should validate during deserialization.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Stable type name used as the storage partition and in events.
    const ENTITY_NAME: &'static str;

    /// Returns the identity and timestamps.
    fn meta(&self) -> &EntityMeta;

    /// Returns mutable access to the timestamps.
    fn meta_mut(&mut self) -> &mut EntityMeta;

    /// Returns the entity identifier.
    fn id(&self) -> Uuid {
        self.meta().id()
    }

    /// Stamps the last-updated time from `clock`.
    fn mark_updated(&mut self, clock: &dyn Clock) {
        self.meta_mut().mark_updated(clock.now());
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct At(DateTime<Utc>);

    impl Clock for At {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_new_meta_has_creation_time_and_no_update() {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let meta = EntityMeta::new(&At(created));

        assert!(!meta.id().is_nil());
        assert_eq!(meta.created_at(), created);
        assert_eq!(meta.updated_at(), None);
    }

    #[test]
    fn test_mark_updated_leaves_identity_and_creation_time() {
        let created = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2026, 1, 15, 11, 0, 0).unwrap();
        let mut meta = EntityMeta::new(&At(created));
        let id = meta.id();

        meta.mark_updated(updated);

        assert_eq!(meta.id(), id);
        assert_eq!(meta.created_at(), created);
        assert_eq!(meta.updated_at(), Some(updated));
    }

    #[test]
    fn test_meta_serializes_with_camel_case_fields() {
        let meta = EntityMeta::new(&At(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()));

        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["id"], meta.id().to_string());
        assert!(json["createdAt"].is_string());
        assert!(json["updatedAt"].is_null());
    }
}
