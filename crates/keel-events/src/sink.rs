//! Destinations for built lifecycle events
//!
//! Sinks own create-or-increment semantics: repeated occurrences with the
//! same reason and involved object are merged into one Event whose count and
//! last-seen timestamp grow. The pipeline never reads events back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
use parking_lot::Mutex;
use tracing::debug;

use keel_common::retry::{retry_with_backoff, RetryConfig};
use keel_common::Error;

use crate::item::EventItem;
use crate::record::EventRecord;

/// Trait for persisting lifecycle events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Store one occurrence of an event
    async fn put(&self, record: EventRecord) -> Result<(), Error>;
}

/// Production sink writing core/v1 Events through the Kubernetes API
pub struct KubeEventSink {
    client: Client,
    retry: RetryConfig,
}

impl KubeEventSink {
    /// Create a sink using the default API retry policy
    pub fn new(client: Client) -> Self {
        Self {
            client,
            retry: RetryConfig::with_max_retries(3),
        }
    }

    /// Override the retry policy for API calls
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn create_or_increment(
        &self,
        api: &Api<Event>,
        name: &str,
        record: &EventRecord,
    ) -> Result<(), Error> {
        let now = Utc::now();
        match api.get_opt(name).await? {
            Some(existing) => {
                let patch = increment_patch(&existing, record, now);
                api.patch(name, &PatchParams::default(), &Patch::Merge(&patch))
                    .await?;
                debug!(event = %name, count = %patch["count"], "incremented event");
            }
            None => {
                api.create(&PostParams::default(), &record.to_kube_event(name, now))
                    .await?;
                debug!(event = %name, reason = record.reason(), "created event");
            }
        }
        Ok(())
    }
}

/// Merge patch counting one more occurrence of `existing`
///
/// The patch is pinned to the resource version that was read, so a
/// concurrent increment makes it fail with a conflict instead of being lost.
/// The retry re-reads the Event and counts again.
fn increment_patch(
    existing: &Event,
    record: &EventRecord,
    now: DateTime<Utc>,
) -> serde_json::Value {
    serde_json::json!({
        "metadata": {
            "resourceVersion": existing.metadata.resource_version,
        },
        "count": existing.count.unwrap_or(1) + 1,
        "lastTimestamp": Time(now),
        "message": record.message(),
    })
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn put(&self, record: EventRecord) -> Result<(), Error> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), record.namespace());
        let name = record.event_name();
        let (api, name, record) = (&api, name.as_str(), &record);
        retry_with_backoff(&self.retry, "put_event", move || {
            self.create_or_increment(api, name, record)
        })
        .await
    }
}

/// One merged event held by [`MemoryEventSink`]
#[derive(Clone, Debug)]
pub struct StoredEvent {
    /// Event object name
    pub name: String,
    /// Latest occurrence
    pub record: EventRecord,
    /// Number of occurrences merged into this entry
    pub count: u32,
    /// Time of the first occurrence
    pub first_seen: DateTime<Utc>,
    /// Time of the latest occurrence
    pub last_seen: DateTime<Utc>,
}

/// In-memory sink with the same merge semantics as the Kubernetes one
///
/// Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<StoredEvent>>,
}

impl MemoryEventSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all merged events, in first-seen order
    pub fn events(&self) -> Vec<StoredEvent> {
        self.events.lock().clone()
    }

    /// Latest record of every merged event of the given kind
    pub fn records_for(&self, item: EventItem) -> Vec<EventRecord> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.record.item() == item)
            .map(|e| e.record.clone())
            .collect()
    }

    /// Total occurrences of the given kind, counting merged repeats
    pub fn occurrences(&self, item: EventItem) -> u32 {
        self.events
            .lock()
            .iter()
            .filter(|e| e.record.item() == item)
            .map(|e| e.count)
            .sum()
    }

    /// Whether any event of the given kind was stored
    pub fn contains(&self, item: EventItem) -> bool {
        self.occurrences(item) > 0
    }

    /// Reasons of stored events in first-seen order
    pub fn reasons(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|e| e.record.reason()).collect()
    }

    /// Drop everything stored so far
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn put(&self, record: EventRecord) -> Result<(), Error> {
        let now = Utc::now();
        let name = record.event_name();
        let mut events = self.events.lock();
        match events.iter_mut().find(|e| e.name == name) {
            Some(existing) => {
                existing.count += 1;
                existing.last_seen = now;
                existing.record = record;
            }
            None => events.push(StoredEvent {
                name,
                record,
                count: 1,
                first_seen: now,
                last_seen: now,
            }),
        }
        Ok(())
    }
}
