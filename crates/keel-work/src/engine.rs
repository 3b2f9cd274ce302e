//! Step chain execution
//!
//! The engine runs one chain against one packet, strictly in order. Each
//! action's [`NextAction`] decides where execution goes next. Independent
//! attempts each get their own task via [`Engine::spawn`].

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use keel_common::metrics;
use keel_common::retry::RetryConfig;
use keel_common::Error;

use crate::packet::Packet;
use crate::step::{NextAction, Step};

/// How a chain run ended when it did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Every step ran to the end of the chain
    Completed,
    /// A step asked to skip the rest of the chain
    Terminated,
    /// The attempt was cancelled before the chain finished
    Cancelled,
}

impl AttemptOutcome {
    /// Label used for metrics and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Terminated => "terminated",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Runs step chains against packets
#[derive(Clone, Debug, Default)]
pub struct Engine {
    retry: RetryConfig,
}

impl Engine {
    /// Create an engine with the given retry policy
    pub fn new(retry: RetryConfig) -> Self {
        Self { retry }
    }

    /// Retry policy applied to steps that request a retry
    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run a chain to completion
    pub async fn run(&self, step: Step, packet: &mut Packet) -> Result<AttemptOutcome, Error> {
        self.run_with_cancel(step, packet, &CancellationToken::new())
            .await
    }

    /// Run a chain, stopping before the next non-critical step once `cancel` fires
    ///
    /// A step that has started always finishes; cancellation is observed
    /// between steps and while waiting to retry.
    pub async fn run_with_cancel(
        &self,
        step: Step,
        packet: &mut Packet,
        cancel: &CancellationToken,
    ) -> Result<AttemptOutcome, Error> {
        let attempt = packet.attempt_id();
        // resume points for chains that inserted a sub-chain
        let mut resume: Vec<Step> = Vec::new();
        let mut current = Some(step);
        let mut retries = 0u32;

        loop {
            let step = match current.take().or_else(|| resume.pop()) {
                Some(step) => step,
                None => return Ok(AttemptOutcome::Completed),
            };

            if cancel.is_cancelled() && !step.is_critical() {
                info!(%attempt, step = %step.name(), "attempt cancelled, skipping remaining steps");
                return Ok(AttemptOutcome::Cancelled);
            }

            let Some(action) = step.action() else {
                trace!(%attempt, "reached terminal step");
                continue;
            };

            trace!(%attempt, step = %step.name(), retries, "running step");
            let next = match action.apply(packet).await {
                Ok(next) => next,
                Err(e) => {
                    warn!(%attempt, step = %step.name(), error = %e, "step failed, aborting attempt");
                    return Err(e);
                }
            };

            match next {
                NextAction::Continue => {
                    retries = 0;
                    current = step.next().cloned();
                }
                NextAction::Insert(sub) => {
                    retries = 0;
                    if let Some(next) = step.next() {
                        resume.push(next.clone());
                    }
                    current = Some(sub);
                }
                NextAction::Branch(other) => {
                    retries = 0;
                    current = Some(other);
                }
                NextAction::Terminate => {
                    debug!(%attempt, step = %step.name(), "step terminated the attempt");
                    return Ok(AttemptOutcome::Terminated);
                }
                NextAction::RetryAfter(requested) => {
                    if retries >= self.retry.max_retries {
                        warn!(%attempt, step = %step.name(), retries, "retry budget exhausted");
                        return Err(Error::attempt_failed(step.name(), retries));
                    }
                    retries += 1;
                    metrics::record_step_retry();

                    let delay = self.retry.delay_for(retries, requested);
                    debug!(
                        %attempt,
                        step = %step.name(),
                        retry = retries,
                        delay_ms = delay.as_millis(),
                        "step requested retry"
                    );

                    if step.is_critical() {
                        tokio::time::sleep(delay).await;
                    } else {
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = cancel.cancelled() => {
                                info!(%attempt, step = %step.name(), "attempt cancelled while waiting to retry");
                                return Ok(AttemptOutcome::Cancelled);
                            }
                        }
                    }
                    current = Some(step);
                }
            }
        }
    }

    /// Run a chain on its own task, handing the packet back when done
    pub fn spawn(
        &self,
        step: Step,
        mut packet: Packet,
        cancel: CancellationToken,
    ) -> JoinHandle<(Packet, Result<AttemptOutcome, Error>)> {
        let engine = self.clone();
        tokio::spawn(async move {
            let result = engine.run_with_cancel(step, &mut packet, &cancel).await;
            (packet, result)
        })
    }
}
