//! Lifecycle events for Domain reconciliation
//!
//! - [`item`] - catalog of event kinds with reasons, patterns and severities
//! - [`data`] - event requests with optional overrides
//! - [`record`] - built events and their core/v1 Event form
//! - [`helper`] - correlation rules and event steps
//! - [`sink`] - Kubernetes and in-memory event stores

#![deny(missing_docs)]

pub mod data;
pub mod helper;
pub mod item;
pub mod record;
pub mod sink;

pub use data::EventData;
pub use helper::EventHelper;
pub use item::{EventItem, EventScope, EventSeverity};
pub use record::{EventRecord, InvolvedObject};
pub use sink::{EventSink, KubeEventSink, MemoryEventSink, StoredEvent};
