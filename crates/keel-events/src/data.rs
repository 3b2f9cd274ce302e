//! Requested event, as handed to the event step builder

use crate::item::EventItem;

/// What to emit and with which overrides
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventData {
    /// Kind of event
    pub item: EventItem,
    /// Free text embedded in the message (failure text)
    pub message: Option<String>,
    /// Short failure category recorded with PROCESSING_FAILED
    pub reason: Option<String>,
    /// Namespace of a namespace-watch event, or of a domain event raised
    /// outside any attempt
    pub namespace: Option<String>,
    /// Resource name override; namespace-watch kinds default to the
    /// namespace. Ignored by domain events of an attempt.
    pub resource_name: Option<String>,
}

impl EventData {
    /// Request an event of the given kind with no overrides
    pub fn new(item: EventItem) -> Self {
        Self {
            item,
            message: None,
            reason: None,
            namespace: None,
            resource_name: None,
        }
    }

    /// Set the free-text message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Set the failure category
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Set the namespace override
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Set the resource name override
    pub fn resource_name(mut self, name: impl Into<String>) -> Self {
        self.resource_name = Some(name.into());
        self
    }
}

impl From<EventItem> for EventData {
    fn from(item: EventItem) -> Self {
        Self::new(item)
    }
}
