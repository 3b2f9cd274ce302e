//! Metrics for the reconciliation pipeline
//!
//! Provides OpenTelemetry metrics for:
//! - Reconciliation attempts (count by result, duration)
//! - Step retries
//! - Lifecycle events (emitted, suppressed and failed to store, by reason)
//!
//! Without an installed meter provider the instruments are no-ops.

use once_cell::sync::Lazy;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram, Meter};
use opentelemetry::KeyValue;

/// Global meter for Keel metrics
static METER: Lazy<Meter> = Lazy::new(|| global::meter("keel"));

/// Counter of finished reconciliation attempts
///
/// Labels:
/// - `result`: completed, terminated, cancelled, failed
pub static ATTEMPTS_TOTAL: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("keel_attempts_total")
        .with_description("Total number of reconciliation attempts by result")
        .with_unit("{attempts}")
        .build()
});

/// Histogram of reconciliation attempt duration
pub static ATTEMPT_DURATION: Lazy<Histogram<f64>> = Lazy::new(|| {
    METER
        .f64_histogram("keel_attempt_duration_seconds")
        .with_description("Duration of reconciliation attempts in seconds")
        .with_unit("s")
        .build()
});

/// Counter of step retries requested by actions
pub static STEP_RETRIES: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("keel_step_retries_total")
        .with_description("Total number of step retries")
        .with_unit("{retries}")
        .build()
});

/// Counter of lifecycle events handed to the sink
///
/// Labels:
/// - `reason`: event reason (e.g. DomainProcessingStarting)
pub static EVENTS_EMITTED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("keel_events_emitted_total")
        .with_description("Total number of lifecycle events emitted")
        .with_unit("{events}")
        .build()
});

/// Counter of lifecycle events declined by a correlation rule
pub static EVENTS_SUPPRESSED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("keel_events_suppressed_total")
        .with_description("Total number of lifecycle events suppressed by correlation rules")
        .with_unit("{events}")
        .build()
});

/// Counter of lifecycle events the sink failed to store
pub static EVENTS_STORE_FAILED: Lazy<Counter<u64>> = Lazy::new(|| {
    METER
        .u64_counter("keel_events_store_failed_total")
        .with_description("Total number of lifecycle events the sink failed to store")
        .with_unit("{events}")
        .build()
});

/// Record a finished attempt
pub fn record_attempt(result: &'static str, duration_secs: f64) {
    let attrs = [KeyValue::new("result", result)];
    ATTEMPTS_TOTAL.add(1, &attrs);
    ATTEMPT_DURATION.record(duration_secs, &attrs);
}

/// Record an emitted event
pub fn record_event_emitted(reason: &'static str) {
    EVENTS_EMITTED.add(1, &[KeyValue::new("reason", reason)]);
}

/// Record a suppressed event
pub fn record_event_suppressed(reason: &'static str) {
    EVENTS_SUPPRESSED.add(1, &[KeyValue::new("reason", reason)]);
}

/// Record an event the sink failed to store
pub fn record_event_store_failed(reason: &'static str) {
    EVENTS_STORE_FAILED.add(1, &[KeyValue::new("reason", reason)]);
}

/// Record one step retry
pub fn record_step_retry() {
    STEP_RETRIES.add(1, &[]);
}
