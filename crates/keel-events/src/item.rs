//! Catalog of lifecycle event kinds
//!
//! Each kind owns its reason string, message pattern, severity and scope.
//! Patterns use `{resource}` for the resource id and `{text}` for the
//! free-text part (failure reasons).

/// Placeholder substituted with the resource id
pub const RESOURCE_PLACEHOLDER: &str = "{resource}";

/// Placeholder substituted with the free-text message
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Text used when a failure is reported without a message
pub const UNKNOWN_FAILURE_TEXT: &str = "unknown";

/// Well-known event reason strings.
///
/// These appear in `kubectl get events` under the REASON column.
pub mod reasons {
    /// Make-right processing of a domain began
    pub const DOMAIN_PROCESSING_STARTING: &str = "DomainProcessingStarting";
    /// Make-right processing of a domain finished successfully
    pub const DOMAIN_PROCESSING_COMPLETED: &str = "DomainProcessingCompleted";
    /// Processing is being retried after earlier failures
    pub const DOMAIN_PROCESSING_RETRYING: &str = "DomainProcessingRetrying";
    /// An attempt failed
    pub const DOMAIN_PROCESSING_FAILED: &str = "DomainProcessingFailed";
    /// Processing was abandoned and will not be retried
    pub const DOMAIN_PROCESSING_ABORTED: &str = "DomainProcessingAborted";
    /// A domain resource appeared
    pub const DOMAIN_CREATED: &str = "DomainCreated";
    /// A domain resource was modified
    pub const DOMAIN_CHANGED: &str = "DomainChanged";
    /// A domain resource was removed
    pub const DOMAIN_DELETED: &str = "DomainDeleted";
    /// The operator started watching a namespace
    pub const NAMESPACE_WATCHING_STARTED: &str = "NamespaceWatchingStarted";
    /// The operator stopped watching a namespace
    pub const NAMESPACE_WATCHING_STOPPED: &str = "NamespaceWatchingStopped";
}

/// Event severity, as shown in the TYPE column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventSeverity {
    /// Routine lifecycle transition
    Normal,
    /// Something went wrong
    Warning,
}

impl EventSeverity {
    /// Kubernetes `type` field value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

/// What an event's involved object is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventScope {
    /// About the domain reconciled by the current attempt
    Domain,
    /// About a namespace named explicitly in the event data
    Namespace,
}

/// Lifecycle event kinds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventItem {
    /// Make-right processing began
    ProcessingStarting,
    /// Make-right processing finished; requires a prior STARTING
    ProcessingCompleted,
    /// Processing retried after earlier failures
    ProcessingRetrying,
    /// An attempt failed with a reason
    ProcessingFailed,
    /// Processing abandoned; requires a prior FAILED
    ProcessingAborted,
    /// Domain resource created
    ResourceCreated,
    /// Domain resource changed
    ResourceChanged,
    /// Domain resource deleted
    ResourceDeleted,
    /// Namespace watch started
    NamespaceWatchingStarted,
    /// Namespace watch stopped
    NamespaceWatchingStopped,
}

/// All EventItem variants for iteration.
pub const ALL_EVENT_ITEMS: &[EventItem] = &[
    EventItem::ProcessingStarting,
    EventItem::ProcessingCompleted,
    EventItem::ProcessingRetrying,
    EventItem::ProcessingFailed,
    EventItem::ProcessingAborted,
    EventItem::ResourceCreated,
    EventItem::ResourceChanged,
    EventItem::ResourceDeleted,
    EventItem::NamespaceWatchingStarted,
    EventItem::NamespaceWatchingStopped,
];

impl EventItem {
    /// Machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ProcessingStarting => reasons::DOMAIN_PROCESSING_STARTING,
            Self::ProcessingCompleted => reasons::DOMAIN_PROCESSING_COMPLETED,
            Self::ProcessingRetrying => reasons::DOMAIN_PROCESSING_RETRYING,
            Self::ProcessingFailed => reasons::DOMAIN_PROCESSING_FAILED,
            Self::ProcessingAborted => reasons::DOMAIN_PROCESSING_ABORTED,
            Self::ResourceCreated => reasons::DOMAIN_CREATED,
            Self::ResourceChanged => reasons::DOMAIN_CHANGED,
            Self::ResourceDeleted => reasons::DOMAIN_DELETED,
            Self::NamespaceWatchingStarted => reasons::NAMESPACE_WATCHING_STARTED,
            Self::NamespaceWatchingStopped => reasons::NAMESPACE_WATCHING_STOPPED,
        }
    }

    /// Message pattern with `{resource}` and `{text}` placeholders
    pub fn pattern(&self) -> &'static str {
        match self {
            Self::ProcessingStarting => {
                "Creating or updating Kubernetes presence for WebLogic Domain with UID {resource}"
            }
            Self::ProcessingCompleted => "Successfully completed processing domain resource {resource}",
            Self::ProcessingRetrying => {
                "Retrying the processing of domain resource {resource} after one or more failed attempts"
            }
            Self::ProcessingFailed => {
                "Failed to complete processing domain resource {resource} due to: {text}, \
                 the processing will be retried if needed"
            }
            Self::ProcessingAborted => {
                "Stop processing domain resource {resource} due to: {text}, \
                 the processing will not be retried"
            }
            Self::ResourceCreated => "Domain resource {resource} was created",
            Self::ResourceChanged => "Domain resource {resource} was changed",
            Self::ResourceDeleted => "Domain resource {resource} was deleted",
            Self::NamespaceWatchingStarted => "Started watching namespace {resource}",
            Self::NamespaceWatchingStopped => "Stopped watching namespace {resource}",
        }
    }

    /// Severity of the event
    pub fn severity(&self) -> EventSeverity {
        match self {
            Self::ProcessingFailed | Self::ProcessingAborted => EventSeverity::Warning,
            _ => EventSeverity::Normal,
        }
    }

    /// Whether the involved object is the attempt's domain or a namespace
    pub fn scope(&self) -> EventScope {
        match self {
            Self::NamespaceWatchingStarted | Self::NamespaceWatchingStopped => EventScope::Namespace,
            _ => EventScope::Domain,
        }
    }

    /// Whether the message embeds free text
    pub fn takes_text(&self) -> bool {
        self.pattern().contains(TEXT_PLACEHOLDER)
    }

    /// Render the message for a resource id and optional free text
    pub fn message(&self, resource: &str, text: Option<&str>) -> String {
        self.pattern()
            .replace(RESOURCE_PLACEHOLDER, resource)
            .replace(TEXT_PLACEHOLDER, text.unwrap_or(UNKNOWN_FAILURE_TEXT))
    }
}

impl std::fmt::Display for EventItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}
