//! # Auto-save Coordinator
//!
//! Bridges live in-memory form state to persisted drafts.
//!
//! ## Flush Scheduling
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      DEFERRED, COALESCED FLUSHES                        │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │   update(f) ──► apply f to state (synchronously)                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   flush slot empty? ──no──► coalesced += 1, done                        │
//! │        │                                                                │
//! │        yes                                                              │
//! │        ▼                                                                │
//! │   spawn task: yield once, clear slot, flush                             │
//! │                                   │                                     │
//! │                                   ▼                                     │
//! │             mint draft id if none, snapshot *current* state,            │
//! │             extract display name / category, sink.save(...)            │
//! │                                   │                                     │
//! │                 ok ──► flushes += 1   err ──► failures += 1, warn       │
//! │                                                                         │
//! │   Only one flush is ever scheduled. Edits made before it runs are      │
//! │   saved together; edits made while it runs schedule the next one.     │
//! │                                                                         │
//! │   reset_form / load_from_store bump an epoch so a flush scheduled      │
//! │   before them is dropped instead of resurrecting old state.            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A failed flush never touches in-memory state; the next flush saves the
//! latest state again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;
use crate::storage::drafts::DraftPartition;
use crate::storage::kv::KeyValueStore;
use crate::storage::namespace::{namespaced_key, Partition};
use crate::time::now_timestamp_millis;

/// Mint a new draft id: `draft_<unix millis>_<8 hex chars>`.
pub fn generate_draft_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("draft_{}_{}", now_timestamp_millis(), &suffix[..8])
}

// ============================================================================
// SINK
// ============================================================================

/// State restored by [`FormSink::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedForm<T> {
    pub draft_id: Option<String>,
    pub state: T,
}

/// Where the coordinator persists form snapshots.
#[async_trait]
pub trait FormSink<T>: Send + Sync {
    /// Persist a full snapshot of the form.
    async fn save(
        &self,
        draft_id: &str,
        state: &T,
        display_name: Option<String>,
        category: Option<String>,
    ) -> Result<()>;

    /// Previously persisted state, if any.
    async fn load(&self, draft_id: Option<&str>) -> Result<Option<LoadedForm<T>>>;

    /// Remove whatever [`save`](Self::save) wrote.
    async fn discard(&self, draft_id: Option<&str>) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FormRecord<S> {
    draft_id: Option<String>,
    state: S,
}

/// Sink backed by the draft partition, a generic form key, or both.
#[derive(Clone, Default)]
pub struct StoreSink {
    drafts: Option<DraftPartition>,
    form: Option<(KeyValueStore, String)>,
}

impl StoreSink {
    /// Save through the draft partition's create-or-update entry point.
    pub fn drafts(drafts: DraftPartition) -> Self {
        Self {
            drafts: Some(drafts),
            form: None,
        }
    }

    /// Save the whole form under `data_<key>`.
    pub fn form_key(store: KeyValueStore, key: impl Into<String>) -> Self {
        Self {
            drafts: None,
            form: Some((store, key.into())),
        }
    }

    /// Also save the whole form under `data_<key>`.
    pub fn with_form_key(mut self, store: KeyValueStore, key: impl Into<String>) -> Self {
        self.form = Some((store, key.into()));
        self
    }
}

#[async_trait]
impl<T> FormSink<T> for StoreSink
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn save(
        &self,
        draft_id: &str,
        state: &T,
        display_name: Option<String>,
        category: Option<String>,
    ) -> Result<()> {
        if let Some(drafts) = &self.drafts {
            drafts
                .store_draft(draft_id, state, display_name.as_deref(), category.as_deref())
                .await?;
        }
        if let Some((store, key)) = &self.form {
            let record = FormRecord {
                draft_id: Some(draft_id.to_string()),
                state,
            };
            store
                .put(&namespaced_key(Partition::Data, key), &record)
                .await?;
        }
        Ok(())
    }

    async fn load(&self, draft_id: Option<&str>) -> Result<Option<LoadedForm<T>>> {
        if let (Some(drafts), Some(id)) = (&self.drafts, draft_id) {
            if let Some(draft) = drafts.get_draft::<T>(id).await? {
                return Ok(Some(LoadedForm {
                    draft_id: Some(draft.id),
                    state: draft.payload,
                }));
            }
        }
        if let Some((store, key)) = &self.form {
            let record: Option<FormRecord<T>> =
                store.get(&namespaced_key(Partition::Data, key)).await?;
            if let Some(record) = record {
                return Ok(Some(LoadedForm {
                    draft_id: record.draft_id,
                    state: record.state,
                }));
            }
        }
        Ok(None)
    }

    async fn discard(&self, draft_id: Option<&str>) -> Result<()> {
        if let (Some(drafts), Some(id)) = (&self.drafts, draft_id) {
            drafts.delete_draft(id).await?;
        }
        if let Some((store, key)) = &self.form {
            store.delete(&namespaced_key(Partition::Data, key)).await?;
        }
        Ok(())
    }
}

// ============================================================================
// COORDINATOR
// ============================================================================

type Extractor<T> = Box<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// Counters describing coordinator activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AutoSaveStats {
    /// Successful flushes
    pub flushes: u64,
    /// Flushes whose save failed
    pub failures: u64,
    /// Edits absorbed by an already scheduled flush
    pub coalesced: u64,
}

struct FormState<T> {
    value: T,
    draft_id: Option<String>,
    epoch: u64,
}

struct Inner<T> {
    sink: Arc<dyn FormSink<T>>,
    initial: T,
    state: Mutex<FormState<T>>,
    pending: Mutex<Option<(u64, JoinHandle<()>)>>,
    flush_lock: AsyncMutex<()>,
    display_name: Option<Extractor<T>>,
    category: Option<Extractor<T>>,
    flushes: AtomicU64,
    failures: AtomicU64,
    coalesced: AtomicU64,
}

/// Builder for [`AutoSaveCoordinator`].
pub struct AutoSaveBuilder<T> {
    initial: T,
    sink: Arc<dyn FormSink<T>>,
    draft_id: Option<String>,
    display_name: Option<Extractor<T>>,
    category: Option<Extractor<T>>,
}

impl<T> AutoSaveBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Resume an existing draft instead of minting a new id.
    pub fn draft_id(mut self, id: impl Into<String>) -> Self {
        self.draft_id = Some(id.into());
        self
    }

    /// Derive the draft's display name from the state.
    pub fn display_name(mut self, f: impl Fn(&T) -> Option<String> + Send + Sync + 'static) -> Self {
        self.display_name = Some(Box::new(f));
        self
    }

    /// Derive the draft's category from the state.
    pub fn category(mut self, f: impl Fn(&T) -> Option<String> + Send + Sync + 'static) -> Self {
        self.category = Some(Box::new(f));
        self
    }

    pub fn build(self) -> AutoSaveCoordinator<T> {
        AutoSaveCoordinator {
            inner: Arc::new(Inner {
                sink: self.sink,
                state: Mutex::new(FormState {
                    value: self.initial.clone(),
                    draft_id: self.draft_id,
                    epoch: 0,
                }),
                initial: self.initial,
                pending: Mutex::new(None),
                flush_lock: AsyncMutex::new(()),
                display_name: self.display_name,
                category: self.category,
                flushes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }
}

/// In-memory form state with deferred, coalesced persistence.
///
/// Must be used from within a Tokio runtime. Cloning shares the state.
pub struct AutoSaveCoordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for AutoSaveCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> AutoSaveCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn builder(initial: T, sink: Arc<dyn FormSink<T>>) -> AutoSaveBuilder<T> {
        AutoSaveBuilder {
            initial,
            sink,
            draft_id: None,
            display_name: None,
            category: None,
        }
    }

    /// Coordinator with no extractors.
    pub fn new(initial: T, sink: Arc<dyn FormSink<T>>) -> Self {
        Self::builder(initial, sink).build()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> T {
        self.inner.state.lock().value.clone()
    }

    /// Draft id, once one has been minted or loaded.
    pub fn draft_id(&self) -> Option<String> {
        self.inner.state.lock().draft_id.clone()
    }

    pub fn stats(&self) -> AutoSaveStats {
        AutoSaveStats {
            flushes: self.inner.flushes.load(Ordering::SeqCst),
            failures: self.inner.failures.load(Ordering::SeqCst),
            coalesced: self.inner.coalesced.load(Ordering::SeqCst),
        }
    }

    /// Whether a flush is scheduled but has not started.
    pub fn is_flush_pending(&self) -> bool {
        self.inner.pending.lock().is_some()
    }

    /// Apply `f` to a copy of the state, store the result and schedule a
    /// flush.
    ///
    /// `f` runs without any lock held, so it may read [`state`](Self::state)
    /// or [`draft_id`](Self::draft_id). Concurrent updates are last writer
    /// wins. An edit that straddles a [`reset_form`](Self::reset_form) or
    /// [`load_from_store`](Self::load_from_store) is discarded.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let (mut value, epoch) = {
            let state = self.inner.state.lock();
            (state.value.clone(), state.epoch)
        };
        f(&mut value);

        {
            let mut state = self.inner.state.lock();
            if state.epoch != epoch {
                tracing::debug!(epoch, current = state.epoch, "Dropping edit made before reset");
                return;
            }
            state.value = value;
        }
        self.schedule(epoch);
    }

    /// Replace the whole state and schedule a flush.
    pub fn set(&self, value: T) {
        self.update(|state| *state = value);
    }

    fn schedule(&self, epoch: u64) {
        let mut pending = self.inner.pending.lock();
        if pending.is_some() {
            self.inner.coalesced.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::task::yield_now().await;
            inner.run_scheduled(epoch).await;
        });
        *pending = Some((epoch, handle));
    }

    /// Save the current state now, returning the save error if any.
    pub async fn flush_now(&self) -> Result<()> {
        let epoch = self.inner.state.lock().epoch;
        self.inner.flush(epoch).await
    }

    /// Wait until the scheduled flush (if any) and any running flush finish.
    pub async fn settle(&self) {
        let handle = self.inner.pending.lock().take();
        if let Some((_, handle)) = handle {
            let _ = handle.await;
        }
        drop(self.inner.flush_lock.lock().await);
    }

    /// Restore the initial state, forget the draft id, drop a scheduled flush
    /// and delete what was persisted.
    pub async fn reset_form(&self) -> Result<()> {
        let previous_id = {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.value = self.inner.initial.clone();
            state.draft_id.take()
        };
        self.cancel_pending();

        let _guard = self.inner.flush_lock.lock().await;
        self.inner.sink.discard(previous_id.as_deref()).await?;
        tracing::debug!(draft_id = ?previous_id, "Form reset");
        Ok(())
    }

    /// Replace the in-memory state with what was persisted.
    ///
    /// Returns `false` (state untouched) when nothing was found.
    pub async fn load_from_store(&self, draft_id: Option<&str>) -> Result<bool> {
        let loaded = {
            let _guard = self.inner.flush_lock.lock().await;
            self.inner.sink.load(draft_id).await?
        };

        let Some(loaded) = loaded else {
            return Ok(false);
        };

        {
            let mut state = self.inner.state.lock();
            state.epoch += 1;
            state.value = loaded.state;
            state.draft_id = loaded.draft_id.or_else(|| draft_id.map(str::to_string));
        }
        self.cancel_pending();
        tracing::debug!(draft_id = ?self.draft_id(), "Form restored");
        Ok(true)
    }

    fn cancel_pending(&self) {
        if let Some((_, handle)) = self.inner.pending.lock().take() {
            handle.abort();
        }
    }
}

impl<T> Inner<T>
where
    T: Clone + Send + Sync + 'static,
{
    async fn run_scheduled(&self, epoch: u64) {
        {
            let mut pending = self.pending.lock();
            if matches!(pending.as_ref(), Some((e, _)) if *e == epoch) {
                *pending = None;
            }
        }
        // Already logged and counted
        let _ = self.flush(epoch).await;
    }

    async fn flush(&self, epoch: u64) -> Result<()> {
        let _guard = self.flush_lock.lock().await;

        let (draft_id, snapshot) = {
            let mut state = self.state.lock();
            if state.epoch != epoch {
                tracing::debug!("Dropping flush scheduled before a reset");
                return Ok(());
            }
            let id = state
                .draft_id
                .get_or_insert_with(generate_draft_id)
                .clone();
            (id, state.value.clone())
        };

        let display_name = self.display_name.as_ref().and_then(|f| f(&snapshot));
        let category = self.category.as_ref().and_then(|f| f(&snapshot));

        match self
            .sink
            .save(&draft_id, &snapshot, display_name, category)
            .await
        {
            Ok(()) => {
                self.flushes.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(draft_id = %draft_id, "Form flushed");
                Ok(())
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                tracing::warn!(draft_id = %draft_id, "Auto-save failed, will retry on next edit: {}", e);
                Err(e)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::error::Error;
    use crate::storage::connection::ConnectionManager;
    use crate::storage::drafts::Draft;
    use crate::time::system_clock;
    use std::sync::atomic::AtomicBool;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct ClientForm {
        first_name: String,
        last_name: String,
        client_type: Option<String>,
        step: u32,
    }

    #[derive(Default)]
    struct RecordingSink {
        saves: Mutex<Vec<(String, ClientForm, Option<String>)>>,
        discarded: Mutex<Vec<Option<String>>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl FormSink<ClientForm> for RecordingSink {
        async fn save(
            &self,
            draft_id: &str,
            state: &ClientForm,
            display_name: Option<String>,
            _category: Option<String>,
        ) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(Error::ConnectionFailed("storage denied".into()));
            }
            self.saves
                .lock()
                .push((draft_id.to_string(), state.clone(), display_name));
            Ok(())
        }

        async fn load(&self, _draft_id: Option<&str>) -> Result<Option<LoadedForm<ClientForm>>> {
            Ok(self.saves.lock().last().map(|(id, state, _)| LoadedForm {
                draft_id: Some(id.clone()),
                state: state.clone(),
            }))
        }

        async fn discard(&self, draft_id: Option<&str>) -> Result<()> {
            self.discarded.lock().push(draft_id.map(str::to_string));
            Ok(())
        }
    }

    fn store() -> KeyValueStore {
        let manager = ConnectionManager::new(&StoreConfig::in_memory()).unwrap();
        KeyValueStore::new(manager, system_clock())
    }

    #[test]
    fn test_generate_draft_id_format() {
        let a = generate_draft_id();
        let b = generate_draft_id();
        assert_ne!(a, b);

        let parts: Vec<&str> = a.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "draft");
        assert!(parts[1].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[2].len(), 8);
    }

    #[tokio::test]
    async fn test_rapid_edits_coalesce_into_one_flush() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());

        for step in 1..=5 {
            form.update(|s| s.step = step);
        }
        assert!(form.is_flush_pending());
        form.settle().await;

        let saves = sink.saves.lock();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1.step, 5);
        assert_eq!(
            form.stats(),
            AutoSaveStats {
                flushes: 1,
                failures: 0,
                coalesced: 4
            }
        );
    }

    #[tokio::test]
    async fn test_update_closure_can_read_coordinator() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());
        form.update(|s| s.step = 1);
        form.settle().await;

        let reader = form.clone();
        form.update(|s| {
            s.step = reader.state().step + 1;
            s.client_type = reader.draft_id();
        });
        form.settle().await;

        let state = form.state();
        assert_eq!(state.step, 2);
        assert_eq!(state.client_type, form.draft_id());
        assert_eq!(sink.saves.lock().last().unwrap().1.step, 2);
    }

    #[tokio::test]
    async fn test_draft_id_is_minted_once() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());
        assert!(form.draft_id().is_none());

        form.update(|s| s.step = 1);
        form.settle().await;
        let id = form.draft_id().unwrap();
        assert!(id.starts_with("draft_"));

        form.update(|s| s.step = 2);
        form.settle().await;

        let saves = sink.saves.lock();
        assert_eq!(saves.len(), 2);
        assert!(saves.iter().all(|(saved_id, _, _)| *saved_id == id));
    }

    #[tokio::test]
    async fn test_edit_after_flush_schedules_another() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());

        form.update(|s| s.step = 1);
        form.settle().await;
        assert!(!form.is_flush_pending());

        form.update(|s| s.step = 2);
        assert!(form.is_flush_pending());
        form.settle().await;

        assert_eq!(sink.saves.lock().last().unwrap().1.step, 2);
    }

    #[tokio::test]
    async fn test_failed_flush_keeps_state_and_retries() {
        let sink = Arc::new(RecordingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());

        form.update(|s| s.first_name = "Jane".into());
        form.settle().await;
        assert_eq!(form.stats().failures, 1);
        assert_eq!(form.state().first_name, "Jane");
        assert!(sink.saves.lock().is_empty());

        sink.fail.store(false, Ordering::SeqCst);
        form.update(|s| s.last_name = "Doe".into());
        form.settle().await;

        let saves = sink.saves.lock();
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].1.first_name, "Jane");
        assert_eq!(saves[0].1.last_name, "Doe");
        assert_eq!(form.stats().flushes, 1);
    }

    #[tokio::test]
    async fn test_flush_now_reports_errors() {
        let sink = Arc::new(RecordingSink::default());
        sink.fail.store(true, Ordering::SeqCst);
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());

        assert!(matches!(form.flush_now().await, Err(Error::ConnectionFailed(_))));
    }

    #[tokio::test]
    async fn test_extractors_feed_display_name() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::builder(ClientForm::default(), sink.clone())
            .display_name(|s: &ClientForm| {
                (!s.last_name.is_empty()).then(|| s.last_name.to_uppercase())
            })
            .build();

        form.update(|s| s.last_name = "Doe".into());
        form.settle().await;

        assert_eq!(sink.saves.lock()[0].2.as_deref(), Some("DOE"));
    }

    #[tokio::test]
    async fn test_reset_restores_initial_state() {
        let sink = Arc::new(RecordingSink::default());
        let initial = ClientForm {
            step: 1,
            ..ClientForm::default()
        };
        let form = AutoSaveCoordinator::new(initial.clone(), sink.clone());

        form.update(|s| s.step = 3);
        form.settle().await;
        let id = form.draft_id();

        form.reset_form().await.unwrap();

        assert_eq!(form.state(), initial);
        assert!(form.draft_id().is_none());
        assert_eq!(*sink.discarded.lock(), vec![id]);
    }

    #[tokio::test]
    async fn test_reset_drops_scheduled_flush() {
        let sink = Arc::new(RecordingSink::default());
        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());

        form.update(|s| s.step = 9);
        form.reset_form().await.unwrap();
        form.settle().await;

        assert!(sink.saves.lock().is_empty());
        assert_eq!(form.stats().flushes, 0);
    }

    #[tokio::test]
    async fn test_drafts_sink_end_to_end() {
        let drafts = DraftPartition::new(store());
        let sink = Arc::new(StoreSink::drafts(drafts.clone()));
        let form = AutoSaveCoordinator::builder(ClientForm::default(), sink.clone())
            .category(|s: &ClientForm| s.client_type.clone())
            .build();

        form.update(|s| {
            s.first_name = "Jane".into();
            s.last_name = "Doe".into();
            s.client_type = Some("retail".into());
        });
        form.settle().await;

        let id = form.draft_id().unwrap();
        let draft: Draft<ClientForm> = drafts.get_draft(&id).await.unwrap().unwrap();
        assert_eq!(draft.payload.first_name, "Jane");
        assert_eq!(draft.metadata.display_name, "Jane Doe");
        assert_eq!(draft.metadata.category.as_deref(), Some("retail"));

        form.reset_form().await.unwrap();
        assert!(drafts.get_draft::<ClientForm>(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_from_store_resumes_draft() {
        let drafts = DraftPartition::new(store());
        let sink: Arc<StoreSink> = Arc::new(StoreSink::drafts(drafts.clone()));

        let first = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());
        first.update(|s| s.step = 4);
        first.settle().await;
        let id = first.draft_id().unwrap();

        let resumed = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());
        assert!(resumed.load_from_store(Some(&id)).await.unwrap());
        assert_eq!(resumed.state().step, 4);
        assert_eq!(resumed.draft_id().as_deref(), Some(id.as_str()));

        resumed.update(|s| s.step = 5);
        resumed.settle().await;
        let listing = drafts.get_all_drafts().await.unwrap();
        assert_eq!(listing.drafts.len(), 1);

        let missing = AutoSaveCoordinator::new(ClientForm::default(), sink);
        assert!(!missing.load_from_store(Some("nope")).await.unwrap());
        assert_eq!(missing.state(), ClientForm::default());
    }

    #[tokio::test]
    async fn test_form_key_sink_round_trip() {
        let store = store();
        let sink = Arc::new(StoreSink::form_key(store.clone(), "onboarding_form"));

        let form = AutoSaveCoordinator::new(ClientForm::default(), sink.clone());
        form.update(|s| s.first_name = "Ada".into());
        form.settle().await;
        assert!(store.contains("data_onboarding_form").await.unwrap());

        let restored = AutoSaveCoordinator::new(ClientForm::default(), sink);
        assert!(restored.load_from_store(None).await.unwrap());
        assert_eq!(restored.state().first_name, "Ada");
        assert_eq!(restored.draft_id(), form.draft_id());

        restored.reset_form().await.unwrap();
        assert!(!store.contains("data_onboarding_form").await.unwrap());
    }
}
