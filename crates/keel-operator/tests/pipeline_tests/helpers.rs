//! Shared fixtures for pipeline tests

use std::sync::Arc;

use tokio::sync::Notify;

use keel_common::retry::RetryConfig;
use keel_common::{DomainRef, Error, StaticIdentity};
use keel_events::{EventHelper, MemoryEventSink};
use keel_operator::{DomainProcessor, ProcessorConfig};
use keel_work::{NextAction, Step};

pub const UID: &str = "uid1";
pub const NS: &str = "ns1";
pub const OPERATOR_NAMESPACE: &str = "operator-namespace";
pub const OPERATOR_POD_NAME: &str = "keel-operator-1234";

/// Everything one test needs, wired against an in-memory sink
pub struct Harness {
    pub identity: Arc<StaticIdentity>,
    pub sink: Arc<MemoryEventSink>,
    pub processor: DomainProcessor,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ProcessorConfig {
            retry: RetryConfig::with_max_retries(2),
            failure_retry_limit: 3,
        })
    }

    pub fn with_config(config: ProcessorConfig) -> Self {
        let identity = Arc::new(StaticIdentity::new(OPERATOR_NAMESPACE, OPERATOR_POD_NAME));
        let sink = Arc::new(MemoryEventSink::new());
        let processor = DomainProcessor::builder(identity.clone(), sink.clone())
            .config(config)
            .build();
        Self {
            identity,
            sink,
            processor,
        }
    }

    pub fn helper(&self) -> &EventHelper {
        self.processor.events()
    }
}

pub fn domain() -> DomainRef {
    DomainRef::new(UID, NS)
}

pub fn ok_body() -> Step {
    Step::sync_fn("body", |_| Ok(NextAction::Continue))
}

pub fn failing_body(error: fn() -> Error) -> Step {
    Step::sync_fn("body", move |_| Err(error()))
}

/// Body step that signals `entered`, then blocks until `release` fires,
/// then finishes with `result`
pub fn gated_body(
    entered: Arc<Notify>,
    release: Arc<Notify>,
    result: fn() -> Result<NextAction, Error>,
) -> Step {
    Step::from_fn("gated-body", move |_packet| {
        let entered = entered.clone();
        let release = release.clone();
        Box::pin(async move {
            entered.notify_one();
            release.notified().await;
            result()
        })
    })
}
