//! Common types for Keel: errors, identity, retry, telemetry and the Domain reference

#![deny(missing_docs)]

pub mod domain;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod retry;
pub mod telemetry;

pub use domain::DomainRef;
pub use error::Error;
pub use identity::{OperatorIdentity, OsEnvIdentity, ResolvedIdentity, StaticIdentity};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Component identifier reported on every Event created by the operator
pub const OPERATOR_COMPONENT: &str = "keel.operator";

/// Label carrying the domain UID on domain-scoped resources and events
pub const DOMAIN_UID_LABEL: &str = "keel.dev/domainUID";

/// Label marking resources and events created by the operator
pub const CREATED_BY_OPERATOR_LABEL: &str = "keel.dev/createdByOperator";

/// Annotation recording the operator namespace on emitted events
pub const OPERATOR_NAMESPACE_ANNOTATION: &str = "keel.dev/operatorNamespace";

/// Environment variable holding the operator namespace (downward API)
pub const OPERATOR_NAMESPACE_ENV: &str = "OPERATOR_NAMESPACE";

/// Environment variable holding the operator pod name (downward API)
pub const OPERATOR_POD_NAME_ENV: &str = "OPERATOR_POD_NAME";
