//! Make-right orchestration for Domain resources
//!
//! - [`processor`] - shared state and entry points for attempts
//! - [`make_right`] - chain assembly and failure handling for one attempt
//! - [`failure`] - FAILED/ABORTED reporting steps
//! - [`registry`] - in-flight attempts and failure counts per domain
//! - [`reconciler`] - seam for the reconciliation body
//! - [`config`] - binary configuration

#![deny(missing_docs)]

pub mod config;
pub mod failure;
pub mod make_right;
pub mod processor;
pub mod reconciler;
pub mod registry;

pub use failure::create_failure_related_steps;
pub use make_right::MakeRightDomainOperation;
pub use processor::{DomainProcessor, DomainProcessorBuilder, ProcessorConfig};
pub use reconciler::{DomainReconciler, NoopReconciler};
pub use registry::{AttemptGuard, AttemptRegistry};
