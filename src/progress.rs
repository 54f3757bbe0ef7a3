//! Extraction progress tracking.
//!
//! Every extraction request carries an optional request identifier. While the
//! extractor runs it merges updates into a [`ProgressStore`]; subscribers
//! follow along through [`subscribe`], a stream that ticks once per second
//! until the record reaches a terminal status.

use futures_util::Stream;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// How often the publisher re-emits the current record.
const PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

/// Default idle lifetime of a store entry before eviction.
pub const DEFAULT_PROGRESS_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Initializing,
    Extracting,
    Completed,
    Failed,
    Error,
}

impl ProgressStatus {
    /// Terminal records are frozen; no further merges apply.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressStatus::Completed | ProgressStatus::Failed | ProgressStatus::Error
        )
    }
}

/// Per-batch detail for large playlists resolved in chunks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchProgress {
    pub current: u32,
    pub total: u32,
    pub processed: u32,
    pub total_songs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub status: ProgressStatus,
    pub progress: u8,
    pub message: String,
    pub current: u32,
    pub total: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch: Option<BatchProgress>,
}

impl ProgressRecord {
    pub fn initializing() -> Self {
        Self {
            status: ProgressStatus::Initializing,
            progress: 0,
            message: "Initializing extraction process...".to_string(),
            current: 0,
            total: 0,
            batch: None,
        }
    }
}

/// A partial record; set fields overwrite, unset fields are retained.
#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub status: Option<ProgressStatus>,
    pub progress: Option<u8>,
    pub message: Option<String>,
    pub current: Option<u32>,
    pub total: Option<u32>,
    pub batch: Option<BatchProgress>,
}

impl ProgressUpdate {
    /// The record every request starts from.
    pub fn initializing() -> Self {
        Self {
            status: Some(ProgressStatus::Initializing),
            progress: Some(0),
            message: Some("Initializing extraction process...".to_string()),
            current: Some(0),
            total: Some(10),
            batch: None,
        }
    }

    /// A mid-extraction step at the standard ten-step scale.
    pub fn step(progress: u8, message: impl Into<String>, current: u32) -> Self {
        Self {
            status: Some(ProgressStatus::Extracting),
            progress: Some(progress),
            message: Some(message.into()),
            current: Some(current),
            total: Some(10),
            batch: None,
        }
    }

    pub fn completed(message: impl Into<String>) -> Self {
        Self::terminal(ProgressStatus::Completed, message)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::terminal(ProgressStatus::Failed, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::terminal(ProgressStatus::Error, message)
    }

    fn terminal(status: ProgressStatus, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            progress: Some(100),
            message: Some(message.into()),
            current: Some(10),
            total: Some(10),
            batch: None,
        }
    }

    pub fn with_batch(mut self, batch: BatchProgress) -> Self {
        self.batch = Some(batch);
        self
    }
}

/// Keyed progress storage shared between the orchestrator, the extractors and
/// the publisher. Injected everywhere as `Arc<dyn ProgressStore>` so the
/// in-memory implementation can be swapped for an external one.
pub trait ProgressStore: Send + Sync {
    fn get(&self, request_id: &str) -> Option<ProgressRecord>;

    fn set(&self, request_id: &str, record: ProgressRecord);

    /// Shallow-merge an update into the stored record, creating it when
    /// absent. Terminal records are left untouched and `progress` never
    /// decreases. Returns the record as stored after the merge.
    fn merge(&self, request_id: &str, update: ProgressUpdate) -> ProgressRecord;
}

struct Entry {
    record: ProgressRecord,
    touched: Instant,
}

/// In-memory [`ProgressStore`] with idle-based eviction.
pub struct MemoryProgressStore {
    entries: RwLock<HashMap<String, Entry>>,
    ttl: Duration,
}

impl MemoryProgressStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Drop entries that have not been touched within the TTL. The server
    /// calls this from a periodic sweep task.
    pub fn evict_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap();
        let before = entries.len();
        entries.retain(|_, entry| entry.touched.elapsed() < self.ttl);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_TTL)
    }
}

impl ProgressStore for MemoryProgressStore {
    fn get(&self, request_id: &str) -> Option<ProgressRecord> {
        self.entries
            .read()
            .unwrap()
            .get(request_id)
            .map(|entry| entry.record.clone())
    }

    fn set(&self, request_id: &str, record: ProgressRecord) {
        self.entries.write().unwrap().insert(
            request_id.to_string(),
            Entry {
                record,
                touched: Instant::now(),
            },
        );
    }

    fn merge(&self, request_id: &str, update: ProgressUpdate) -> ProgressRecord {
        let mut entries = self.entries.write().unwrap();
        let entry = entries
            .entry(request_id.to_string())
            .or_insert_with(|| Entry {
                record: ProgressRecord::initializing(),
                touched: Instant::now(),
            });

        if !entry.record.status.is_terminal() {
            let record = &mut entry.record;
            if let Some(status) = update.status {
                record.status = status;
            }
            if let Some(progress) = update.progress {
                record.progress = record.progress.max(progress);
            }
            if let Some(message) = update.message {
                record.message = message;
            }
            if let Some(current) = update.current {
                record.current = current;
            }
            if let Some(total) = update.total {
                record.total = total;
            }
            if let Some(batch) = update.batch {
                record.batch = Some(batch);
            }
        }
        entry.touched = Instant::now();
        entry.record.clone()
    }
}

/// Handle an extractor uses to report progress. A reporter without a request
/// identifier (CLI one-shot runs) drops every update.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    inner: Option<(Arc<dyn ProgressStore>, String)>,
}

impl ProgressReporter {
    pub fn new(store: Arc<dyn ProgressStore>, request_id: Option<String>) -> Self {
        Self {
            inner: request_id.map(|id| (store, id)),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn update(&self, update: ProgressUpdate) {
        if let Some((store, request_id)) = &self.inner {
            store.merge(request_id, update);
        }
    }
}

enum SubscribeState {
    First,
    Waiting,
    Done,
}

/// Follow a request's progress. The current record is emitted immediately
/// (an `initializing` placeholder is created if the id is unknown), then once
/// per second until a terminal record has been emitted. Every subscriber gets
/// its own timer.
pub fn subscribe(
    store: Arc<dyn ProgressStore>,
    request_id: String,
) -> impl Stream<Item = ProgressRecord> {
    stream::unfold(SubscribeState::First, move |state| {
        let store = store.clone();
        let request_id = request_id.clone();
        async move {
            let record = match state {
                SubscribeState::Done => return None,
                SubscribeState::First => match store.get(&request_id) {
                    Some(record) => record,
                    None => {
                        let record = ProgressRecord::initializing();
                        store.set(&request_id, record.clone());
                        record
                    }
                },
                SubscribeState::Waiting => {
                    tokio::time::sleep(PUBLISH_INTERVAL).await;
                    // Evicted mid-subscription: nothing left to report.
                    store.get(&request_id)?
                }
            };

            let next = if record.status.is_terminal() {
                SubscribeState::Done
            } else {
                SubscribeState::Waiting
            };
            Some((record, next))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn store() -> MemoryProgressStore {
        MemoryProgressStore::default()
    }

    #[test]
    fn test_merge_creates_entry() {
        let store = store();
        assert!(store.get("req-1").is_none());

        let record = store.merge("req-1", ProgressUpdate::step(5, "starting", 1));
        assert_eq!(record.status, ProgressStatus::Extracting);
        assert_eq!(record.progress, 5);
        assert_eq!(record.total, 10);
        assert_eq!(store.get("req-1").unwrap(), record);
    }

    #[test]
    fn test_merge_is_shallow() {
        let store = store();
        store.merge("req-1", ProgressUpdate::step(20, "fetching", 3));
        let record = store.merge(
            "req-1",
            ProgressUpdate {
                message: Some("still fetching".into()),
                ..Default::default()
            },
        );
        // Untouched fields are retained
        assert_eq!(record.progress, 20);
        assert_eq!(record.current, 3);
        assert_eq!(record.message, "still fetching");
    }

    #[test]
    fn test_progress_never_decreases() {
        let store = store();
        store.merge("req-1", ProgressUpdate::step(40, "a", 5));
        let record = store.merge("req-1", ProgressUpdate::step(35, "fallback", 4));
        assert_eq!(record.progress, 40);
        assert_eq!(record.message, "fallback");
    }

    #[test]
    fn test_terminal_records_are_frozen() {
        let store = store();
        store.merge("req-1", ProgressUpdate::completed("done"));
        let record = store.merge("req-1", ProgressUpdate::step(10, "late update", 1));
        assert_eq!(record.status, ProgressStatus::Completed);
        assert_eq!(record.progress, 100);
        assert_eq!(record.message, "done");
    }

    #[test]
    fn test_batch_progress_is_carried() {
        let store = store();
        let record = store.merge(
            "req-1",
            ProgressUpdate::step(60, "batch 1/3", 7).with_batch(BatchProgress {
                current: 1,
                total: 3,
                processed: 0,
                total_songs: 55,
            }),
        );
        assert_eq!(record.batch.unwrap().total_songs, 55);
    }

    #[test]
    fn test_evict_expired() {
        let store = MemoryProgressStore::new(Duration::from_millis(5));
        store.merge("stale", ProgressUpdate::completed("done"));
        std::thread::sleep(Duration::from_millis(20));
        store.merge("fresh", ProgressUpdate::step(10, "working", 1));

        let evicted = store.evict_expired();
        assert_eq!(evicted, 1);
        assert!(store.get("stale").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn test_record_serialization() {
        let record = ProgressRecord::initializing();
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"status\":\"initializing\""));
        assert!(!json.contains("batch"));
    }

    #[tokio::test]
    async fn test_subscribe_emits_placeholder_immediately() {
        let store: Arc<dyn ProgressStore> = Arc::new(MemoryProgressStore::default());
        let mut stream = Box::pin(subscribe(store.clone(), "req-x".into()));

        let first = stream.next().await.unwrap();
        assert_eq!(first.status, ProgressStatus::Initializing);
        // The placeholder is now visible to the extractor side as well
        assert!(store.get("req-x").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_stops_after_terminal() {
        let store: Arc<dyn ProgressStore> = Arc::new(MemoryProgressStore::default());
        store.merge("req-x", ProgressUpdate::step(50, "halfway", 5));

        let mut stream = Box::pin(subscribe(store.clone(), "req-x".into()));
        let first = stream.next().await.unwrap();
        assert_eq!(first.progress, 50);

        store.merge("req-x", ProgressUpdate::completed("done"));
        let second = stream.next().await.unwrap();
        assert_eq!(second.status, ProgressStatus::Completed);

        assert!(stream.next().await.is_none());
    }
}
