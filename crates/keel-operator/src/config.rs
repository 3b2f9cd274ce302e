//! Command-line and environment configuration for the operator binary

use std::time::Duration;

use clap::Parser;

use keel_common::retry::RetryConfig;
use keel_common::telemetry::TelemetryConfig;

use crate::processor::{ProcessorConfig, DEFAULT_FAILURE_RETRY_LIMIT};

/// Keel - make-right reconciliation for Domain resources
#[derive(Parser, Debug, Clone)]
#[command(name = "keel", version, about, long_about = None)]
pub struct Args {
    /// Namespaces whose domains this operator manages
    #[arg(
        long,
        env = "KEEL_DOMAIN_NAMESPACES",
        value_delimiter = ',',
        default_value = "default"
    )]
    pub namespaces: Vec<String>,

    /// Retries allowed for a step that asks to be retried
    #[arg(long, env = "KEEL_STEP_MAX_RETRIES", default_value_t = 5)]
    pub step_max_retries: u32,

    /// First retry delay in milliseconds
    #[arg(long, env = "KEEL_RETRY_INITIAL_DELAY_MS", default_value_t = 200)]
    pub retry_initial_delay_ms: u64,

    /// Upper bound for a retry delay in milliseconds
    #[arg(long, env = "KEEL_RETRY_MAX_DELAY_MS", default_value_t = 30_000)]
    pub retry_max_delay_ms: u64,

    /// Consecutive failed attempts after which processing of a domain is aborted
    #[arg(long, env = "KEEL_FAILURE_RETRY_LIMIT", default_value_t = DEFAULT_FAILURE_RETRY_LIMIT)]
    pub failure_retry_limit: u32,

    /// Log human-readable lines instead of JSON
    #[arg(long, env = "KEEL_PLAIN_LOGS")]
    pub plain_logs: bool,
}

impl Args {
    /// Retry policy for steps
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.step_max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            ..RetryConfig::default()
        }
    }

    /// Make-right processing configuration
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            retry: self.retry_config(),
            failure_retry_limit: self.failure_retry_limit,
        }
    }

    /// Logging configuration
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: "keel-operator".to_string(),
            json: !self.plain_logs,
        }
    }
}
