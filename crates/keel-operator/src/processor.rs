//! Domain processor
//!
//! Holds everything make-right attempts share: the engine, the event helper,
//! the attempt registry and the reconciliation body. Cloning is cheap and
//! every clone works on the same registry.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use keel_common::retry::RetryConfig;
use keel_common::{DomainRef, Error, OperatorIdentity};
use keel_events::{EventData, EventHelper, EventItem, EventSink};
use keel_work::{AttemptOutcome, Engine, Packet};

use crate::make_right::MakeRightDomainOperation;
use crate::reconciler::{DomainReconciler, NoopReconciler};
use crate::registry::AttemptRegistry;

/// Default number of consecutive failures after which processing is aborted
pub const DEFAULT_FAILURE_RETRY_LIMIT: u32 = 5;

/// Tuning for make-right processing
#[derive(Clone, Debug)]
pub struct ProcessorConfig {
    /// Retry policy for steps requesting a retry
    pub retry: RetryConfig,
    /// Consecutive failed attempts after which a failure is reported as aborted
    pub failure_retry_limit: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            failure_retry_limit: DEFAULT_FAILURE_RETRY_LIMIT,
        }
    }
}

/// Entry point for reconciling domains and reporting namespace watches
#[derive(Clone)]
pub struct DomainProcessor {
    pub(crate) engine: Engine,
    pub(crate) events: EventHelper,
    pub(crate) registry: Arc<AttemptRegistry>,
    pub(crate) reconciler: Arc<dyn DomainReconciler>,
    pub(crate) failure_retry_limit: u32,
}

impl DomainProcessor {
    /// Create a builder from the identity source and event sink
    pub fn builder(
        identity: Arc<dyn OperatorIdentity>,
        sink: Arc<dyn EventSink>,
    ) -> DomainProcessorBuilder {
        DomainProcessorBuilder::new(identity, sink)
    }

    /// Prepare a make-right attempt for `domain`
    pub fn create_make_right_operation(&self, domain: DomainRef) -> MakeRightDomainOperation {
        MakeRightDomainOperation::new(self.clone(), domain)
    }

    /// Run a default make-right attempt for `domain` on its own task
    pub fn spawn_make_right(&self, domain: DomainRef) -> JoinHandle<Result<AttemptOutcome, Error>> {
        let operation = self.create_make_right_operation(domain);
        tokio::spawn(operation.execute())
    }

    /// Report that `namespace` is now watched
    pub async fn start_namespace_watching(&self, namespace: &str) -> Result<(), Error> {
        self.namespace_event(EventItem::NamespaceWatchingStarted, namespace)
            .await
    }

    /// Report that `namespace` is no longer watched
    pub async fn stop_namespace_watching(&self, namespace: &str) -> Result<(), Error> {
        self.namespace_event(EventItem::NamespaceWatchingStopped, namespace)
            .await
    }

    /// Handle removal of a domain resource
    ///
    /// Cancels the running attempt for it, if any, and reports the deletion.
    pub async fn on_domain_deleted(&self, domain: DomainRef) -> Result<AttemptOutcome, Error> {
        if self.registry.cancel(&domain.uid) {
            info!(domain = %domain, "cancelled in-flight attempt of deleted domain");
        }
        self.create_make_right_operation(domain)
            .with_event_data(EventItem::ResourceDeleted, None)
            .execute()
            .await
    }

    /// Cancel the running attempt for `uid`, returning whether there was one
    pub fn cancel_attempt(&self, uid: &str) -> bool {
        self.registry.cancel(uid)
    }

    /// Event helper used for every attempt
    pub fn events(&self) -> &EventHelper {
        &self.events
    }

    /// Registry of running attempts
    pub fn registry(&self) -> &Arc<AttemptRegistry> {
        &self.registry
    }

    /// Engine running the chains
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    async fn namespace_event(&self, item: EventItem, namespace: &str) -> Result<(), Error> {
        let mut packet = Packet::new();
        let step = self
            .events
            .create_event_step(EventData::new(item).namespace(namespace));
        self.engine.run(step, &mut packet).await?;
        info!(namespace, reason = item.reason(), "reported namespace watch");
        Ok(())
    }
}

/// Builder for [`DomainProcessor`]
pub struct DomainProcessorBuilder {
    identity: Arc<dyn OperatorIdentity>,
    sink: Arc<dyn EventSink>,
    reconciler: Option<Arc<dyn DomainReconciler>>,
    registry: Option<Arc<AttemptRegistry>>,
    config: ProcessorConfig,
}

impl DomainProcessorBuilder {
    fn new(identity: Arc<dyn OperatorIdentity>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            identity,
            sink,
            reconciler: None,
            registry: None,
            config: ProcessorConfig::default(),
        }
    }

    /// Set the reconciliation body (defaults to [`NoopReconciler`])
    pub fn reconciler(mut self, reconciler: Arc<dyn DomainReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Share an existing attempt registry
    pub fn registry(mut self, registry: Arc<AttemptRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the processing configuration
    pub fn config(mut self, config: ProcessorConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the processor
    pub fn build(self) -> DomainProcessor {
        DomainProcessor {
            engine: Engine::new(self.config.retry),
            events: EventHelper::new(self.identity, self.sink),
            registry: self.registry.unwrap_or_default(),
            reconciler: self
                .reconciler
                .unwrap_or_else(|| Arc::new(NoopReconciler)),
            failure_retry_limit: self.config.failure_retry_limit,
        }
    }
}
