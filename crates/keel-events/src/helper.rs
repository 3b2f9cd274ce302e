//! Event decision layer
//!
//! [`EventHelper`] turns an [`EventData`] request into a step. When the step
//! runs it resolves the target, applies the correlation rule of the event
//! kind against the packet's markers, builds the record, records the marker
//! and hands the record to the sink.
//!
//! Sink failures never fail the step. A failed event must never break
//! reconciliation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use keel_common::domain::{DOMAIN_API_VERSION, DOMAIN_KIND};
use keel_common::{
    metrics, Error, OperatorIdentity, ResolvedIdentity, CREATED_BY_OPERATOR_LABEL,
    DOMAIN_UID_LABEL, OPERATOR_COMPONENT,
};
use keel_work::{Action, EventMarkers, FailureMarker, NextAction, Packet, Step};

use crate::data::EventData;
use crate::item::{EventItem, EventScope, UNKNOWN_FAILURE_TEXT};
use crate::record::{EventRecord, InvolvedObject};
use crate::sink::EventSink;

/// Failure category used when a FAILED request names none
pub const UNKNOWN_FAILURE_REASON: &str = "Unknown";

/// Builds event steps and emits lifecycle events for attempts
#[derive(Clone)]
pub struct EventHelper {
    identity: Arc<dyn OperatorIdentity>,
    sink: Arc<dyn EventSink>,
}

/// Where an event points
struct Target {
    resource_id: String,
    namespace: String,
    involved_object: InvolvedObject,
    domain_uid: Option<String>,
}

/// Outcome of a correlation rule
enum Decision {
    /// Emit, with the free text (if any) to embed in the message
    Emit(Option<String>),
    /// Skip, naming the rule that declined
    Suppress(&'static str),
}

impl EventHelper {
    /// Create a helper reading identity from `identity` and writing to `sink`
    pub fn new(identity: Arc<dyn OperatorIdentity>, sink: Arc<dyn EventSink>) -> Self {
        Self { identity, sink }
    }

    /// The sink events are handed to
    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Step that emits `data` when it runs, then continues
    pub fn create_event_step(&self, data: impl Into<EventData>) -> Step {
        let data = data.into();
        Step::new(EventStep {
            name: format!("event-{}", data.item.reason()),
            helper: self.clone(),
            data,
        })
    }

    /// Build the record `data` would produce for this packet
    ///
    /// Returns `Ok(None)` when the correlation rule of the event kind
    /// declines. The packet is not modified.
    pub fn build_record(&self, data: &EventData, packet: &Packet) -> Result<Option<EventRecord>, Error> {
        Ok(self.prepare(data, packet)?.ok())
    }

    /// Record to emit, or the name of the correlation rule that declined
    fn prepare(
        &self,
        data: &EventData,
        packet: &Packet,
    ) -> Result<Result<EventRecord, &'static str>, Error> {
        let target = resolve_target(data, packet)?;
        let text = match decide(data, packet.markers()) {
            Decision::Emit(text) => text,
            Decision::Suppress(rule) => return Ok(Err(rule)),
        };

        let message = data.item.message(&target.resource_id, text.as_deref());
        let mut labels = BTreeMap::new();
        if let Some(uid) = target.domain_uid {
            labels.insert(DOMAIN_UID_LABEL.to_string(), uid);
        }
        labels.insert(CREATED_BY_OPERATOR_LABEL.to_string(), "true".to_string());

        let identity = ResolvedIdentity::resolve(self.identity.as_ref())?;

        Ok(Ok(EventRecord::new(
            data.item,
            target.namespace,
            target.involved_object,
            message,
            labels,
            OPERATOR_COMPONENT.to_string(),
            identity.pod_name,
            identity.namespace,
        )))
    }

    /// Emit `data` for this attempt
    ///
    /// Returns whether a record was handed to the sink. A suppressed event
    /// is not an error.
    pub async fn emit(&self, data: &EventData, packet: &mut Packet) -> Result<bool, Error> {
        let attempt = packet.attempt_id();
        let reason = data.item.reason();

        let record = match self.prepare(data, packet)? {
            Ok(record) => record,
            Err(rule) => {
                debug!(%attempt, reason, rule, "event suppressed");
                metrics::record_event_suppressed(reason);
                return Ok(false);
            }
        };

        record_marker(data, packet.markers_mut());
        packet.markers_mut().push_history(reason);

        debug!(
            %attempt,
            reason,
            namespace = record.namespace(),
            object = %record.involved_object().name,
            "emitting event"
        );
        match self.sink.put(record).await {
            Ok(()) => metrics::record_event_emitted(reason),
            Err(e) => {
                warn!(%attempt, reason, error = %e, "Failed to store lifecycle event");
                metrics::record_event_store_failed(reason);
            }
        }
        Ok(true)
    }
}

fn resolve_target(data: &EventData, packet: &Packet) -> Result<Target, Error> {
    match data.item.scope() {
        EventScope::Domain => match packet.domain() {
            Some(d) => Ok(Target {
                resource_id: d.uid.clone(),
                namespace: d.namespace.clone(),
                involved_object: InvolvedObject {
                    api_version: d.api_version.clone(),
                    kind: d.kind.clone(),
                    name: d.name.clone(),
                    namespace: d.namespace.clone(),
                },
                domain_uid: Some(d.uid.clone()),
            }),
            // no attempt domain: the overrides name the domain
            None => {
                let resource_id = data.resource_name.clone().ok_or_else(|| {
                    Error::validation(format!("{} event has no domain to report on", data.item))
                })?;
                let namespace = data.namespace.clone().ok_or_else(|| {
                    Error::validation(format!("{} event for {resource_id} has no namespace", data.item))
                })?;
                Ok(Target {
                    involved_object: InvolvedObject {
                        api_version: DOMAIN_API_VERSION.to_string(),
                        kind: DOMAIN_KIND.to_string(),
                        name: resource_id.clone(),
                        namespace: namespace.clone(),
                    },
                    domain_uid: Some(resource_id.clone()),
                    resource_id,
                    namespace,
                })
            }
        },
        EventScope::Namespace => {
            let namespace = data.namespace.clone().ok_or_else(|| {
                Error::validation(format!("{} event requires a namespace", data.item))
            })?;
            let resource_id = data.resource_name.clone().unwrap_or_else(|| namespace.clone());

            Ok(Target {
                involved_object: InvolvedObject {
                    api_version: "v1".to_string(),
                    kind: "Namespace".to_string(),
                    name: resource_id.clone(),
                    namespace: namespace.clone(),
                },
                resource_id,
                namespace,
                domain_uid: None,
            })
        }
    }
}

fn decide(data: &EventData, markers: &EventMarkers) -> Decision {
    match data.item {
        EventItem::ProcessingStarting if markers.has_starting() => {
            Decision::Suppress("already-started")
        }
        EventItem::ProcessingCompleted if !markers.has_starting() => {
            Decision::Suppress("not-started")
        }
        EventItem::ProcessingCompleted if markers.has_completed() => {
            Decision::Suppress("already-completed")
        }
        EventItem::ProcessingAborted => match markers.failure() {
            None => Decision::Suppress("not-failed"),
            Some(_) if markers.has_aborted() => Decision::Suppress("already-aborted"),
            Some(failure) => {
                Decision::Emit(Some(data.message.clone().unwrap_or_else(|| failure.message.clone())))
            }
        },
        EventItem::ProcessingFailed => {
            let marker = failure_marker(data);
            if markers.failure() == Some(&marker) {
                Decision::Suppress("same-failure")
            } else {
                Decision::Emit(data.message.clone())
            }
        }
        _ => Decision::Emit(data.message.clone()),
    }
}

fn failure_marker(data: &EventData) -> FailureMarker {
    FailureMarker {
        reason: data
            .reason
            .clone()
            .unwrap_or_else(|| UNKNOWN_FAILURE_REASON.to_string()),
        message: data
            .message
            .clone()
            .unwrap_or_else(|| UNKNOWN_FAILURE_TEXT.to_string()),
    }
}

fn record_marker(data: &EventData, markers: &mut EventMarkers) {
    match data.item {
        EventItem::ProcessingStarting => {
            markers.record_starting();
        }
        EventItem::ProcessingRetrying => {
            markers.record_retrying();
        }
        EventItem::ProcessingCompleted => {
            markers.record_completed();
        }
        EventItem::ProcessingAborted => {
            markers.record_aborted();
        }
        EventItem::ProcessingFailed => {
            markers.record_failure(failure_marker(data));
        }
        _ => {}
    }
}

struct EventStep {
    name: String,
    helper: EventHelper,
    data: EventData,
}

#[async_trait]
impl Action for EventStep {
    fn name(&self) -> &str {
        &self.name
    }

    async fn apply(&self, packet: &mut Packet) -> Result<NextAction, Error> {
        self.helper.emit(&self.data, packet).await?;
        Ok(NextAction::Continue)
    }
}
