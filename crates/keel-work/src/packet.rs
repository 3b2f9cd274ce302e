//! Attempt-scoped execution context
//!
//! A [`Packet`] is created when a reconciliation attempt starts and dropped
//! when it ends. The engine hands it to one step at a time as `&mut`, so no
//! locking is needed inside an attempt.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use keel_common::{DomainRef, Error};

/// Failure recorded by a PROCESSING_FAILED emission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailureMarker {
    /// Short failure category (e.g. "Kubernetes")
    pub reason: String,
    /// Human-readable failure text embedded in later ABORTED messages
    pub message: String,
}

/// Lifecycle events already recorded in this attempt
///
/// Every `record_*` method is idempotent and returns whether the marker was
/// newly recorded.
#[derive(Clone, Debug, Default)]
pub struct EventMarkers {
    starting: bool,
    retrying: bool,
    completed: bool,
    aborted: bool,
    failure: Option<FailureMarker>,
    history: Vec<String>,
}

impl EventMarkers {
    /// A PROCESSING_STARTING event was emitted
    pub fn has_starting(&self) -> bool {
        self.starting
    }

    /// A PROCESSING_RETRYING event was emitted
    pub fn has_retrying(&self) -> bool {
        self.retrying
    }

    /// A PROCESSING_COMPLETED event was emitted
    pub fn has_completed(&self) -> bool {
        self.completed
    }

    /// A PROCESSING_ABORTED event was emitted
    pub fn has_aborted(&self) -> bool {
        self.aborted
    }

    /// The recorded failure, if a PROCESSING_FAILED event was emitted
    pub fn failure(&self) -> Option<&FailureMarker> {
        self.failure.as_ref()
    }

    /// Event reasons in emission order
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Mark STARTING as seen
    pub fn record_starting(&mut self) -> bool {
        !std::mem::replace(&mut self.starting, true)
    }

    /// Mark RETRYING as seen
    pub fn record_retrying(&mut self) -> bool {
        !std::mem::replace(&mut self.retrying, true)
    }

    /// Mark COMPLETED as seen
    pub fn record_completed(&mut self) -> bool {
        !std::mem::replace(&mut self.completed, true)
    }

    /// Mark ABORTED as seen
    pub fn record_aborted(&mut self) -> bool {
        !std::mem::replace(&mut self.aborted, true)
    }

    /// Record a failure; an identical failure already on record is a no-op
    pub fn record_failure(&mut self, marker: FailureMarker) -> bool {
        if self.failure.as_ref() == Some(&marker) {
            return false;
        }
        self.failure = Some(marker);
        true
    }

    /// Append an emitted reason to the history
    pub fn push_history(&mut self, reason: impl Into<String>) {
        self.history.push(reason.into());
    }
}

/// Mutable context shared by all steps of one reconciliation attempt
#[derive(Debug)]
pub struct Packet {
    attempt_id: Uuid,
    domain: Option<DomainRef>,
    markers: EventMarkers,
    values: HashMap<String, serde_json::Value>,
}

impl Packet {
    /// Create a packet for an attempt that is not about a particular domain
    pub fn new() -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            domain: None,
            markers: EventMarkers::default(),
            values: HashMap::new(),
        }
    }

    /// Create a packet for an attempt reconciling `domain`
    pub fn for_domain(domain: DomainRef) -> Self {
        Self {
            domain: Some(domain),
            ..Self::new()
        }
    }

    /// Unique id of this attempt
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    /// Domain being reconciled, if any
    pub fn domain(&self) -> Option<&DomainRef> {
        self.domain.as_ref()
    }

    /// Lifecycle markers recorded so far
    pub fn markers(&self) -> &EventMarkers {
        &self.markers
    }

    /// Mutable access to lifecycle markers
    pub fn markers_mut(&mut self) -> &mut EventMarkers {
        &mut self.markers
    }

    /// Store a value for later steps, replacing any previous one
    pub fn insert<V: Serialize>(&mut self, key: impl Into<String>, value: &V) -> Result<(), Error> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .map_err(|e| Error::serialization(format!("packet value {key}: {e}")))?;
        self.values.insert(key, value);
        Ok(())
    }

    /// Read a value stored by an earlier step
    ///
    /// Returns `Ok(None)` if the key is absent, an error if the stored value
    /// does not deserialize into `V`.
    pub fn get<V: DeserializeOwned>(&self, key: &str) -> Result<Option<V>, Error> {
        self.values
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone())
                    .map_err(|e| Error::serialization(format!("packet value {key}: {e}")))
            })
            .transpose()
    }

    /// Whether a value is stored under `key`
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Remove a stored value
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.values.remove(key)
    }
}

impl Default for Packet {
    fn default() -> Self {
        Self::new()
    }
}
