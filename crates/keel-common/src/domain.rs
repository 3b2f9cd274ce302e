//! Reference to the Domain resource an attempt reconciles

use serde::{Deserialize, Serialize};

/// Default API version of the Domain custom resource
pub const DOMAIN_API_VERSION: &str = "weblogic.oracle/v8";

/// Kind of the Domain custom resource
pub const DOMAIN_KIND: &str = "Domain";

/// Identity of a managed Domain resource
///
/// The `uid` is the domain UID, used as the resource id in messages and
/// labels. `name` is the Kubernetes object name and defaults to the uid.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainRef {
    /// Domain UID
    pub uid: String,
    /// Kubernetes object name
    pub name: String,
    /// Namespace the domain lives in
    pub namespace: String,
    /// API version of the resource
    pub api_version: String,
    /// Kind of the resource
    pub kind: String,
}

impl DomainRef {
    /// Create a reference whose object name equals its uid
    pub fn new(uid: impl Into<String>, namespace: impl Into<String>) -> Self {
        let uid = uid.into();
        Self {
            name: uid.clone(),
            uid,
            namespace: namespace.into(),
            api_version: DOMAIN_API_VERSION.to_string(),
            kind: DOMAIN_KIND.to_string(),
        }
    }

    /// Override the Kubernetes object name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }
}

impl std::fmt::Display for DomainRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.uid)
    }
}
