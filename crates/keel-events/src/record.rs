//! Materialized lifecycle events
//!
//! An [`EventRecord`] can only be built inside this crate, by the
//! [`EventHelper`](crate::EventHelper) after its correlation rules passed.
//! Once built it is immutable and is handed to a sink by value.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::{Event, EventSource, ObjectReference};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use uuid::Uuid;

use keel_common::OPERATOR_NAMESPACE_ANNOTATION;

use crate::item::EventItem;

/// Reference to the object an event is about
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InvolvedObject {
    /// API version of the object
    pub api_version: String,
    /// Kind of the object
    pub kind: String,
    /// Name of the object
    pub name: String,
    /// Namespace of the object
    pub namespace: String,
}

impl InvolvedObject {
    /// Kubernetes object reference for this object
    pub fn to_object_reference(&self) -> ObjectReference {
        ObjectReference {
            api_version: Some(self.api_version.clone()),
            kind: Some(self.kind.clone()),
            name: Some(self.name.clone()),
            namespace: Some(self.namespace.clone()),
            ..Default::default()
        }
    }
}

/// A fully built lifecycle event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventRecord {
    item: EventItem,
    namespace: String,
    involved_object: InvolvedObject,
    message: String,
    labels: BTreeMap<String, String>,
    reporting_component: String,
    reporting_instance: String,
    operator_namespace: String,
}

impl EventRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        item: EventItem,
        namespace: String,
        involved_object: InvolvedObject,
        message: String,
        labels: BTreeMap<String, String>,
        reporting_component: String,
        reporting_instance: String,
        operator_namespace: String,
    ) -> Self {
        Self {
            item,
            namespace,
            involved_object,
            message,
            labels,
            reporting_component,
            reporting_instance,
            operator_namespace,
        }
    }

    /// Kind of event
    pub fn item(&self) -> EventItem {
        self.item
    }

    /// Reason string of the event kind
    pub fn reason(&self) -> &'static str {
        self.item.reason()
    }

    /// Namespace the Event object is created in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The object the event is about
    pub fn involved_object(&self) -> &InvolvedObject {
        &self.involved_object
    }

    /// Rendered message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Labels attached to the Event object
    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    /// Fixed component id of the operator
    pub fn reporting_component(&self) -> &str {
        &self.reporting_component
    }

    /// Operator pod that produced the event
    pub fn reporting_instance(&self) -> &str {
        &self.reporting_instance
    }

    /// Namespace the producing operator runs in
    pub fn operator_namespace(&self) -> &str {
        &self.operator_namespace
    }

    /// Key under which repeated occurrences are merged: reason + involved object
    pub fn dedup_key(&self) -> String {
        let obj = &self.involved_object;
        format!(
            "{}/{}/{}/{}/{}",
            self.reason(),
            obj.api_version,
            obj.kind,
            obj.namespace,
            obj.name
        )
    }

    /// Deterministic Event object name derived from [`dedup_key`](Self::dedup_key)
    pub fn event_name(&self) -> String {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, self.dedup_key().as_bytes());
        format!("{}.{}", self.involved_object.name, id.simple())
    }

    /// Build the core/v1 Event for a first occurrence at `now`
    pub fn to_kube_event(&self, name: &str, now: DateTime<Utc>) -> Event {
        let annotations = BTreeMap::from([(
            OPERATOR_NAMESPACE_ANNOTATION.to_string(),
            self.operator_namespace.clone(),
        )]);

        Event {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(self.namespace.clone()),
                labels: Some(self.labels.clone()),
                annotations: Some(annotations),
                ..Default::default()
            },
            involved_object: self.involved_object.to_object_reference(),
            reason: Some(self.reason().to_string()),
            message: Some(self.message.clone()),
            type_: Some(self.item.severity().as_str().to_string()),
            count: Some(1),
            first_timestamp: Some(Time(now)),
            last_timestamp: Some(Time(now)),
            reporting_component: Some(self.reporting_component.clone()),
            reporting_instance: Some(self.reporting_instance.clone()),
            source: Some(EventSource {
                component: Some(self.reporting_component.clone()),
                host: None,
            }),
            ..Default::default()
        }
    }
}
