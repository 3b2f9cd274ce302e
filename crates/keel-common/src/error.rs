//! Error types for the Keel operator
//!
//! Errors carry structured fields so a failed attempt can be reported as a
//! cluster Event with a meaningful reason and message.

use thiserror::Error;

/// Default step name when an error is raised outside any step
pub const UNKNOWN_STEP: &str = "unknown";

/// Main error type for Keel operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Operator identity could not be resolved at emission time
    #[error("configuration missing: {key} is not set")]
    ConfigurationMissing {
        /// The missing setting (e.g. "OPERATOR_POD_NAME")
        key: String,
    },

    /// Invalid input to a step or operation
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
    },

    /// A step's action failed
    #[error("step {step} failed: {message}")]
    Step {
        /// Name of the failing step
        step: String,
        /// Description of what failed
        message: String,
        /// Whether a later attempt could succeed
        retryable: bool,
    },

    /// A step kept requesting retries until the retry budget ran out
    #[error("attempt failed: step {step} still requested a retry after {retries} retries")]
    AttemptFailed {
        /// Name of the step that exhausted its retries
        step: String,
        /// Number of retries performed
        retries: u32,
    },

    /// Packet value (de)serialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "engine", "sink")
        context: String,
    },
}

impl Error {
    /// Create a configuration-missing error for the given setting
    pub fn configuration_missing(key: impl Into<String>) -> Self {
        Self::ConfigurationMissing { key: key.into() }
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a retryable step error
    pub fn step(step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            message: msg.into(),
            retryable: true,
        }
    }

    /// Create a step error that no later attempt can fix
    pub fn step_permanent(step: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            message: msg.into(),
            retryable: false,
        }
    }

    /// Create an attempt-failed error
    pub fn attempt_failed(step: impl Into<String>, retries: u32) -> Self {
        Self::AttemptFailed {
            step: step.into(),
            retries,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Whether a later attempt at the same reconciliation could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Kube { .. } | Self::AttemptFailed { .. } | Self::Internal { .. } => true,
            Self::Step { retryable, .. } => *retryable,
            Self::ConfigurationMissing { .. }
            | Self::Validation { .. }
            | Self::Serialization { .. } => false,
        }
    }

    /// Whether this error comes from missing operator configuration
    ///
    /// Such failures cannot be reported as Events, since building any
    /// Event needs the same configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::ConfigurationMissing { .. })
    }

    /// Short machine-readable category used as the failure reason
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Kube { .. } => "Kubernetes",
            Self::ConfigurationMissing { .. } => "ConfigurationMissing",
            Self::Validation { .. } => "Validation",
            Self::Step { .. } => "StepFailed",
            Self::AttemptFailed { .. } => "RetriesExhausted",
            Self::Serialization { .. } => "Serialization",
            Self::Internal { .. } => "Internal",
        }
    }
}
