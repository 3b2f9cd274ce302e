//! Operator identity configuration
//!
//! Events report which operator instance produced them. The identity is read
//! through a trait at emission time, so a changed environment between two
//! attempts is picked up by the second one.

use parking_lot::RwLock;

use crate::{Error, OPERATOR_NAMESPACE_ENV, OPERATOR_POD_NAME_ENV};

/// Trait for reading the operator's own namespace and pod name
///
/// This abstracts reading from environment variables, enabling
/// proper unit testing without manipulating global state.
#[cfg_attr(test, mockall::automock)]
pub trait OperatorIdentity: Send + Sync {
    /// Namespace the operator runs in
    fn operator_namespace(&self) -> Option<String>;

    /// Name of the operator pod
    fn operator_pod_name(&self) -> Option<String>;
}

/// Identity values resolved for one emission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    /// Namespace the operator runs in
    pub namespace: String,
    /// Name of the operator pod
    pub pod_name: String,
}

impl ResolvedIdentity {
    /// Resolve both values, failing on the first one that is missing or empty
    pub fn resolve(identity: &dyn OperatorIdentity) -> Result<Self, Error> {
        let namespace = identity
            .operator_namespace()
            .filter(|ns| !ns.is_empty())
            .ok_or_else(|| Error::configuration_missing(OPERATOR_NAMESPACE_ENV))?;
        let pod_name = identity
            .operator_pod_name()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| Error::configuration_missing(OPERATOR_POD_NAME_ENV))?;
        Ok(Self {
            namespace,
            pod_name,
        })
    }
}

/// Default implementation that reads from environment variables on every call
#[derive(Clone, Debug, Default)]
pub struct OsEnvIdentity;

impl OperatorIdentity for OsEnvIdentity {
    fn operator_namespace(&self) -> Option<String> {
        std::env::var(OPERATOR_NAMESPACE_ENV).ok()
    }

    fn operator_pod_name(&self) -> Option<String> {
        std::env::var(OPERATOR_POD_NAME_ENV).ok()
    }
}

/// In-process identity whose values can be changed at runtime
///
/// Used by tests and dry runs.
#[derive(Debug, Default)]
pub struct StaticIdentity {
    namespace: RwLock<Option<String>>,
    pod_name: RwLock<Option<String>>,
}

impl StaticIdentity {
    /// Create an identity with both values set
    pub fn new(namespace: impl Into<String>, pod_name: impl Into<String>) -> Self {
        Self {
            namespace: RwLock::new(Some(namespace.into())),
            pod_name: RwLock::new(Some(pod_name.into())),
        }
    }

    /// Replace the operator namespace
    pub fn set_namespace(&self, namespace: Option<String>) {
        *self.namespace.write() = namespace;
    }

    /// Replace the operator pod name
    pub fn set_pod_name(&self, pod_name: Option<String>) {
        *self.pod_name.write() = pod_name;
    }
}

impl OperatorIdentity for StaticIdentity {
    fn operator_namespace(&self) -> Option<String> {
        self.namespace.read().clone()
    }

    fn operator_pod_name(&self) -> Option<String> {
        self.pod_name.read().clone()
    }
}
