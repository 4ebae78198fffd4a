//! # Draft Partition
//!
//! In-progress form documents stored under `drafts_<id>`.
//!
//! ## Document Shape
//!
//! ```text
//! {
//!   "id": "draft_1718000000000_1a2b3c4d",
//!   "metadata": {
//!     "id": "draft_1718000000000_1a2b3c4d",
//!     "createdAt": 1718000000000,      ← set once, carried forward forever
//!     "updatedAt": 1718000042000,      ← every write, never decreases
//!     "displayName": "Jane Doe",       ← explicit, kept, or inferred once
//!     "category": "retail"             ← optional
//!   },
//!   "payload": { ... caller data ... }
//! }
//! ```
//!
//! ## Create-or-Update
//!
//! ```text
//! store_draft(id, payload, name?, category?)
//!   │
//!   ├── lock drafts_<id>                    (per-id, shared via the manager)
//!   ├── read existing document
//!   │     ├── present → keep createdAt; name? else keep prior name;
//!   │     │             category? else payload category else prior
//!   │     └── absent  → createdAt = now; name? else infer from payload
//!   ├── updatedAt = max(now, previous updatedAt)
//!   └── write full document
//! ```
//!
//! Listing favours availability: a corrupt entry is skipped and reported,
//! never fatal. A targeted [`DraftPartition::get_draft`] on the same entry
//! fails with [`Error::DraftCorrupted`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kv::{KeyValueStore, RawRecord};
use super::namespace::{belongs_to, namespaced_key, strip_namespace, Partition};
use crate::error::{Error, Result};

// ============================================================================
// TYPES
// ============================================================================

/// Identity and bookkeeping of a draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftMetadata {
    /// Logical draft id (without the partition prefix)
    pub id: String,
    /// Milliseconds since the epoch of the first write
    pub created_at: i64,
    /// Milliseconds since the epoch of the latest write
    pub updated_at: i64,
    /// Human-readable name for listings
    pub display_name: String,
    /// Optional grouping, e.g. the kind of client
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A stored draft document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft<T = Value> {
    pub id: String,
    pub metadata: DraftMetadata,
    pub payload: T,
}

/// Result of [`DraftPartition::get_all_drafts`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DraftListing {
    /// Metadata of every readable draft, most recently updated first
    pub drafts: Vec<DraftMetadata>,
    /// Physical keys of entries that could not be decoded
    pub skipped: Vec<String>,
}

// ============================================================================
// DISPLAY NAME POLICY
// ============================================================================

/// Which kind of name wins when a payload carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamePrecedence {
    /// First/last name fields before organization fields
    #[default]
    PersonFirst,
    /// Organization fields before first/last name fields
    OrganizationFirst,
}

/// How a display name and category are inferred from a payload.
///
/// Only top-level string fields are consulted. Empty or whitespace-only
/// values count as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayNamePolicy {
    pub first_name_fields: Vec<String>,
    pub last_name_fields: Vec<String>,
    pub organization_fields: Vec<String>,
    pub category_fields: Vec<String>,
    /// Used when nothing name-like is found
    pub placeholder: String,
    pub precedence: NamePrecedence,
}

impl Default for DisplayNamePolicy {
    fn default() -> Self {
        let fields = |names: &[&str]| names.iter().map(|s| s.to_string()).collect();
        Self {
            first_name_fields: fields(&["firstName", "first_name"]),
            last_name_fields: fields(&["lastName", "last_name"]),
            organization_fields: fields(&[
                "companyName",
                "company_name",
                "businessName",
                "organizationName",
            ]),
            category_fields: fields(&["category", "clientType"]),
            placeholder: "Untitled draft".to_string(),
            precedence: NamePrecedence::PersonFirst,
        }
    }
}

impl DisplayNamePolicy {
    /// Name for a newly created draft whose caller supplied none.
    pub fn infer_display_name(&self, payload: &Value) -> String {
        let person = || self.person_name(payload);
        let organization = || first_string(payload, &self.organization_fields);

        let name = match self.precedence {
            NamePrecedence::PersonFirst => person().or_else(organization),
            NamePrecedence::OrganizationFirst => organization().or_else(person),
        };
        name.unwrap_or_else(|| self.placeholder.clone())
    }

    /// Category carried by the payload itself, if any.
    pub fn infer_category(&self, payload: &Value) -> Option<String> {
        first_string(payload, &self.category_fields)
    }

    fn person_name(&self, payload: &Value) -> Option<String> {
        let parts: Vec<String> = [
            first_string(payload, &self.first_name_fields),
            first_string(payload, &self.last_name_fields),
        ]
        .into_iter()
        .flatten()
        .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

fn first_string(payload: &Value, fields: &[String]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| payload.get(f).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

// ============================================================================
// PARTITION
// ============================================================================

/// Namespaced view of the draft partition.
#[derive(Clone)]
pub struct DraftPartition {
    store: KeyValueStore,
    policy: Arc<DisplayNamePolicy>,
}

impl DraftPartition {
    /// Draft partition with the default [`DisplayNamePolicy`].
    pub fn new(store: KeyValueStore) -> Self {
        Self::with_policy(store, DisplayNamePolicy::default())
    }

    pub fn with_policy(store: KeyValueStore, policy: DisplayNamePolicy) -> Self {
        Self {
            store,
            policy: Arc::new(policy),
        }
    }

    pub fn policy(&self) -> &DisplayNamePolicy {
        &self.policy
    }

    /// Create or update the draft `id`.
    ///
    /// `id` may be given with or without the `drafts_` prefix. Returns the
    /// metadata that was written.
    pub async fn store_draft<T: Serialize + ?Sized>(
        &self,
        id: &str,
        payload: &T,
        display_name: Option<&str>,
        category: Option<&str>,
    ) -> Result<DraftMetadata> {
        let key = namespaced_key(Partition::Drafts, id);
        let id = strip_namespace(&key, Partition::Drafts).unwrap_or(id).to_string();
        let payload = serde_json::to_value(payload)?;

        let _guard = self.store.manager().key_locks().lock(&key).await;

        let previous = match self.store.get_raw(&key).await? {
            Some(record) => match decode_draft::<Value>(&record, &id) {
                Ok(draft) => Some(draft.metadata),
                Err(e) => {
                    tracing::warn!(draft_id = %id, "Overwriting unreadable draft: {}", e);
                    None
                }
            },
            None => None,
        };

        let now = self.store.now_millis();
        let category = category
            .map(str::to_string)
            .or_else(|| self.policy.infer_category(&payload));

        let metadata = match previous {
            Some(prev) => DraftMetadata {
                id: id.clone(),
                created_at: prev.created_at,
                updated_at: now.max(prev.updated_at),
                display_name: display_name
                    .map(str::to_string)
                    .unwrap_or(prev.display_name),
                category: category.or(prev.category),
            },
            None => DraftMetadata {
                id: id.clone(),
                created_at: now,
                updated_at: now,
                display_name: display_name
                    .map(str::to_string)
                    .unwrap_or_else(|| self.policy.infer_display_name(&payload)),
                category,
            },
        };

        let draft = Draft {
            id: id.clone(),
            metadata: metadata.clone(),
            payload,
        };
        self.store.put(&key, &draft).await?;

        tracing::debug!(
            draft_id = %id,
            created_at = metadata.created_at,
            updated_at = metadata.updated_at,
            "Draft stored"
        );
        Ok(metadata)
    }

    /// Read one draft.
    ///
    /// A missing draft is `Ok(None)`; an unreadable one is
    /// [`Error::DraftCorrupted`].
    pub async fn get_draft<T: DeserializeOwned>(&self, id: &str) -> Result<Option<Draft<T>>> {
        let key = namespaced_key(Partition::Drafts, id);
        let id = strip_namespace(&key, Partition::Drafts).unwrap_or(id);

        match self.store.get_raw(&key).await? {
            Some(record) => decode_draft(&record, id).map(Some),
            None => Ok(None),
        }
    }

    /// Metadata of every draft, most recently updated first.
    ///
    /// Entries that fail to decode are logged and listed in
    /// [`DraftListing::skipped`].
    pub async fn get_all_drafts(&self) -> Result<DraftListing> {
        let records = self.store.scan_prefix(&Partition::Drafts.prefix()).await?;

        let mut listing = DraftListing::default();
        for record in records
            .into_iter()
            .filter(|r| belongs_to(&r.key, Partition::Drafts))
        {
            let id = strip_namespace(&record.key, Partition::Drafts)
                .unwrap_or(&record.key)
                .to_string();
            match decode_draft::<Value>(&record, &id) {
                Ok(draft) => listing.drafts.push(draft.metadata),
                Err(e) => {
                    tracing::warn!(key = %record.key, "Skipping corrupt draft: {}", e);
                    listing.skipped.push(record.key);
                }
            }
        }

        listing
            .drafts
            .sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listing)
    }

    /// Remove a draft. Removing a missing draft succeeds.
    pub async fn delete_draft(&self, id: &str) -> Result<()> {
        let key = namespaced_key(Partition::Drafts, id);
        let _guard = self.store.manager().key_locks().lock(&key).await;
        if self.store.delete(&key).await? {
            tracing::debug!(key = %key, "Draft deleted");
        }
        Ok(())
    }

    /// Remove every draft, returning how many were removed.
    pub async fn clear_drafts(&self) -> Result<usize> {
        let removed = self
            .store
            .clear_prefix(&Partition::Drafts.prefix())
            .await?;
        tracing::info!(removed, "Draft partition cleared");
        Ok(removed)
    }
}

fn decode_draft<T: DeserializeOwned>(record: &RawRecord, id: &str) -> Result<Draft<T>> {
    let corrupted = |reason: String| Error::DraftCorrupted {
        id: id.to_string(),
        reason,
    };

    let draft: Draft<T> = record.decode().map_err(|e| corrupted(e.to_string()))?;
    if draft.id != id || draft.metadata.id != id {
        return Err(corrupted(format!(
            "document ids '{}'/'{}' do not match key",
            draft.id, draft.metadata.id
        )));
    }
    Ok(draft)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::storage::connection::ConnectionManager;
    use crate::time::ManualClock;
    use serde_json::json;

    fn drafts_with_clock(clock: &ManualClock) -> (DraftPartition, KeyValueStore) {
        let manager = ConnectionManager::new(&StoreConfig::in_memory()).unwrap();
        let store = KeyValueStore::new(manager, Arc::new(clock.clone()));
        (DraftPartition::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_created_at_is_immutable() {
        let clock = ManualClock::new(1_000);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts
            .store_draft("d1", &json!({"step": 1}), Some("Name"), Some("Cat"))
            .await
            .unwrap();
        let first: Draft = drafts.get_draft("d1").await.unwrap().unwrap();

        clock.advance(500);
        drafts
            .store_draft("d1", &json!({"step": 2}), None, None)
            .await
            .unwrap();
        let second: Draft = drafts.get_draft("d1").await.unwrap().unwrap();

        assert_eq!(second.metadata.created_at, first.metadata.created_at);
        assert!(second.metadata.updated_at > first.metadata.updated_at);
        assert_eq!(second.metadata.display_name, "Name");
        assert_eq!(second.metadata.category.as_deref(), Some("Cat"));
        assert_eq!(second.payload, json!({"step": 2}));
    }

    #[tokio::test]
    async fn test_updated_at_never_regresses() {
        let clock = ManualClock::new(5_000);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts.store_draft("d1", &json!({}), None, None).await.unwrap();
        // Wall clock stepped backwards
        clock.set(4_000);
        let meta = drafts.store_draft("d1", &json!({}), None, None).await.unwrap();

        assert_eq!(meta.updated_at, 5_000);
    }

    #[tokio::test]
    async fn test_metadata_id_matches_draft_id() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);

        let meta = drafts.store_draft("drafts_d9", &json!({}), None, None).await.unwrap();
        assert_eq!(meta.id, "d9");

        let draft: Draft = drafts.get_draft("d9").await.unwrap().unwrap();
        assert_eq!(draft.id, "d9");
        assert_eq!(draft.metadata.id, "d9");
        assert!(store.contains("drafts_d9").await.unwrap());
    }

    #[tokio::test]
    async fn test_listing_is_newest_first() {
        let clock = ManualClock::new(100);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts.store_draft("a", &json!({}), None, None).await.unwrap();
        clock.set(200);
        drafts.store_draft("b", &json!({}), None, None).await.unwrap();
        clock.set(150);
        drafts.store_draft("c", &json!({}), None, None).await.unwrap();

        let listing = drafts.get_all_drafts().await.unwrap();
        let order: Vec<i64> = listing.drafts.iter().map(|m| m.updated_at).collect();
        assert_eq!(order, vec![200, 150, 100]);
        assert!(listing.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_listing_ignores_other_partitions() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);

        drafts.store_draft("d1", &json!({}), None, None).await.unwrap();
        store.put("cache_d1", &json!({"not": "a draft"})).await.unwrap();
        store.put("data_auth_token", "opaque").await.unwrap();

        let listing = drafts.get_all_drafts().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);
        assert!(listing.skipped.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entries_are_skipped_in_listing() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);

        drafts.store_draft("good", &json!({}), None, None).await.unwrap();
        store.put("drafts_bad", "not a draft").await.unwrap();
        store.put("drafts_shape", &json!({"id": "shape"})).await.unwrap();

        let listing = drafts.get_all_drafts().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);
        assert_eq!(listing.drafts[0].id, "good");
        assert_eq!(listing.skipped, vec!["drafts_bad", "drafts_shape"]);
    }

    #[tokio::test]
    async fn test_get_draft_reports_corruption() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);
        store.put("drafts_bad", "not a draft").await.unwrap();

        match drafts.get_draft::<Value>("bad").await {
            Err(Error::DraftCorrupted { id, .. }) => assert_eq!(id, "bad"),
            other => panic!("expected corruption error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_mismatched_id_is_corruption() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);
        drafts.store_draft("a", &json!({}), None, None).await.unwrap();

        let copied = store.get_raw("drafts_a").await.unwrap().unwrap();
        store.put("drafts_b", &copied.decode_value().unwrap()).await.unwrap();

        assert!(matches!(
            drafts.get_draft::<Value>("b").await,
            Err(Error::DraftCorrupted { .. })
        ));
    }

    #[tokio::test]
    async fn test_store_draft_recovers_corrupt_entry() {
        let clock = ManualClock::new(7);
        let (drafts, store) = drafts_with_clock(&clock);
        store.put("drafts_d1", "garbage").await.unwrap();

        let meta = drafts
            .store_draft("d1", &json!({"firstName": "Ada"}), None, None)
            .await
            .unwrap();
        assert_eq!(meta.created_at, 7);
        assert_eq!(meta.display_name, "Ada");
    }

    #[tokio::test]
    async fn test_delete() {
        let clock = ManualClock::new(1);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts.store_draft("d1", &json!({}), None, None).await.unwrap();
        drafts.delete_draft("d1").await.unwrap();
        assert!(drafts.get_draft::<Value>("d1").await.unwrap().is_none());

        drafts.delete_draft("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_drafts() {
        let clock = ManualClock::new(1);
        let (drafts, store) = drafts_with_clock(&clock);
        drafts.store_draft("a", &json!({}), None, None).await.unwrap();
        drafts.store_draft("b", &json!({}), None, None).await.unwrap();
        store.put("cache_a", &json!(1)).await.unwrap();

        assert_eq!(drafts.clear_drafts().await.unwrap(), 2);
        assert!(drafts.get_all_drafts().await.unwrap().drafts.is_empty());
        assert!(store.contains("cache_a").await.unwrap());
    }

    #[tokio::test]
    async fn test_display_name_inference() {
        let clock = ManualClock::new(1);
        let (drafts, _) = drafts_with_clock(&clock);

        let person = drafts
            .store_draft("p", &json!({"firstName": "Jane", "lastName": "Doe"}), None, None)
            .await
            .unwrap();
        assert_eq!(person.display_name, "Jane Doe");

        let company = drafts
            .store_draft("c", &json!({"companyName": "Acme AG"}), None, None)
            .await
            .unwrap();
        assert_eq!(company.display_name, "Acme AG");

        let nothing = drafts
            .store_draft("n", &json!({"firstName": "  "}), None, None)
            .await
            .unwrap();
        assert_eq!(nothing.display_name, "Untitled draft");
    }

    #[tokio::test]
    async fn test_display_name_is_inferred_only_on_creation() {
        let clock = ManualClock::new(1);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts.store_draft("d1", &json!({}), None, None).await.unwrap();
        let meta = drafts
            .store_draft("d1", &json!({"firstName": "Jane"}), None, None)
            .await
            .unwrap();
        assert_eq!(meta.display_name, "Untitled draft");

        let renamed = drafts
            .store_draft("d1", &json!({}), Some("Jane"), None)
            .await
            .unwrap();
        assert_eq!(renamed.display_name, "Jane");
    }

    #[tokio::test]
    async fn test_payload_category_replaces_prior() {
        let clock = ManualClock::new(1);
        let (drafts, _) = drafts_with_clock(&clock);

        drafts.store_draft("d1", &json!({}), None, Some("retail")).await.unwrap();
        let meta = drafts
            .store_draft("d1", &json!({"clientType": "corporate"}), None, None)
            .await
            .unwrap();
        assert_eq!(meta.category.as_deref(), Some("corporate"));
    }

    #[test]
    fn test_organization_precedence() {
        let payload = json!({"firstName": "Jane", "companyName": "Acme AG"});

        let person_first = DisplayNamePolicy::default();
        assert_eq!(person_first.infer_display_name(&payload), "Jane");

        let org_first = DisplayNamePolicy {
            precedence: NamePrecedence::OrganizationFirst,
            ..DisplayNamePolicy::default()
        };
        assert_eq!(org_first.infer_display_name(&payload), "Acme AG");
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let meta = DraftMetadata {
            id: "d1".into(),
            created_at: 1,
            updated_at: 2,
            display_name: "X".into(),
            category: None,
        };
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(
            value,
            json!({"id": "d1", "createdAt": 1, "updatedAt": 2, "displayName": "X"})
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_saves_preserve_created_at() {
        let clock = ManualClock::new(1_000);
        let (drafts, _) = drafts_with_clock(&clock);
        let created = drafts
            .store_draft("d1", &json!({"n": 0}), Some("Name"), None)
            .await
            .unwrap();

        clock.advance(10);
        let handles: Vec<_> = (1..=16)
            .map(|n| {
                let drafts = drafts.clone();
                tokio::spawn(async move {
                    drafts.store_draft("d1", &json!({"n": n}), None, None).await
                })
            })
            .collect();
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let draft: Draft = drafts.get_draft("d1").await.unwrap().unwrap();
        assert_eq!(draft.metadata.created_at, created.created_at);
        assert_eq!(draft.metadata.display_name, "Name");
        assert_eq!(draft.metadata.updated_at, 1_010);
    }
}
