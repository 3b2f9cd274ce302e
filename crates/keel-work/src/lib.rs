//! Step chain execution for Keel reconciliation attempts
//!
//! - [`packet`] - attempt-scoped context with typed lifecycle markers
//! - [`step`] - actions, continuation outcomes and chain composition
//! - [`engine`] - sequential execution with retry and cancellation

#![deny(missing_docs)]

pub mod engine;
pub mod packet;
pub mod step;

pub use engine::{AttemptOutcome, Engine};
pub use packet::{EventMarkers, FailureMarker, Packet};
pub use step::{Action, NextAction, Step};
