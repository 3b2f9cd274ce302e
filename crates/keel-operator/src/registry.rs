//! In-flight attempt registry
//!
//! Tracks at most one running make-right attempt per domain uid together
//! with per-domain consecutive failure counts. Owned by the
//! [`DomainProcessor`](crate::DomainProcessor); there is no global instance.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug)]
struct InFlight {
    attempt_id: Uuid,
    cancel: CancellationToken,
    started_at: Instant,
}

/// Registry of running attempts and failure counts, keyed by domain uid
#[derive(Debug, Default)]
pub struct AttemptRegistry {
    in_flight: DashMap<String, InFlight>,
    failures: DashMap<String, u32>,
}

impl AttemptRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new attempt for `uid`, cancelling any older one still running
    ///
    /// The returned guard deregisters the attempt when dropped, unless a newer
    /// attempt has replaced it in the meantime.
    pub fn begin(self: &Arc<Self>, uid: &str, attempt_id: Uuid) -> AttemptGuard {
        let cancel = CancellationToken::new();
        let entry = InFlight {
            attempt_id,
            cancel: cancel.clone(),
            started_at: Instant::now(),
        };

        if let Some(previous) = self.in_flight.insert(uid.to_string(), entry) {
            info!(
                domain = %uid,
                previous = %previous.attempt_id,
                attempt = %attempt_id,
                running_ms = previous.started_at.elapsed().as_millis(),
                "newer attempt replaces in-flight attempt"
            );
            previous.cancel.cancel();
        }

        AttemptGuard {
            registry: Arc::clone(self),
            uid: uid.to_string(),
            attempt_id,
            cancel,
        }
    }

    /// Cancel the in-flight attempt for `uid`, returning whether there was one
    pub fn cancel(&self, uid: &str) -> bool {
        match self.in_flight.get(uid) {
            Some(entry) => {
                debug!(domain = %uid, attempt = %entry.attempt_id, "cancelling attempt");
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether an attempt for `uid` is registered
    pub fn is_in_flight(&self, uid: &str) -> bool {
        self.in_flight.contains_key(uid)
    }

    /// Id of the attempt currently registered for `uid`
    pub fn current_attempt(&self, uid: &str) -> Option<Uuid> {
        self.in_flight.get(uid).map(|entry| entry.attempt_id)
    }

    /// Number of registered attempts
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Count one more consecutive failure for `uid` and return the new count
    pub fn record_failure(&self, uid: &str) -> u32 {
        let mut count = self.failures.entry(uid.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    /// Forget the failures of `uid`
    pub fn reset_failures(&self, uid: &str) {
        self.failures.remove(uid);
    }

    /// Consecutive failures recorded for `uid`
    pub fn failure_count(&self, uid: &str) -> u32 {
        self.failures.get(uid).map(|count| *count).unwrap_or(0)
    }
}

/// Registration of one running attempt
#[derive(Debug)]
pub struct AttemptGuard {
    registry: Arc<AttemptRegistry>,
    uid: String,
    attempt_id: Uuid,
    cancel: CancellationToken,
}

impl AttemptGuard {
    /// Cancellation token of this attempt
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Attempt id this guard was registered with
    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        let attempt_id = self.attempt_id;
        self.registry
            .in_flight
            .remove_if(&self.uid, |_, entry| entry.attempt_id == attempt_id);
    }
}
