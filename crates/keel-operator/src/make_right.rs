//! Make-right attempts for a single domain
//!
//! A make-right operation brings a domain's cluster presence in line with
//! its resource. The default chain is
//!
//! ```text
//! [RETRYING] -> STARTING -> body -> COMPLETED
//! ```
//!
//! where RETRYING only leads when an earlier attempt for the same domain
//! failed. [`MakeRightDomainOperation::with_event_data`] replaces the body and
//! the final event with a single event of the requested kind.

use std::time::Instant;

use tracing::{info, warn};

use keel_common::{metrics, DomainRef, Error};
use keel_events::{EventData, EventItem};
use keel_work::{AttemptOutcome, Packet, Step};

use crate::failure::create_failure_related_steps;
use crate::processor::DomainProcessor;

/// One make-right attempt, configured before it runs
pub struct MakeRightDomainOperation {
    processor: DomainProcessor,
    domain: DomainRef,
    event_data: Option<EventData>,
    body: Option<Step>,
}

impl MakeRightDomainOperation {
    pub(crate) fn new(processor: DomainProcessor, domain: DomainRef) -> Self {
        Self {
            processor,
            domain,
            event_data: None,
            body: None,
        }
    }

    /// Report the given event instead of running the body
    ///
    /// The chain becomes STARTING followed by this event.
    pub fn with_event_data(mut self, item: EventItem, message: Option<String>) -> Self {
        let mut data = EventData::new(item);
        data.message = message;
        self.event_data = Some(data);
        self
    }

    /// Run `body` instead of the reconciler's steps
    pub fn with_body(mut self, body: Step) -> Self {
        self.body = Some(body);
        self
    }

    /// Domain this operation reconciles
    pub fn domain(&self) -> &DomainRef {
        &self.domain
    }

    /// Chain this operation would run now
    pub fn create_steps(&self) -> Step {
        let events = &self.processor.events;
        let starting = events.create_event_step(EventItem::ProcessingStarting);

        if let Some(data) = &self.event_data {
            return Step::chain([starting, events.create_event_step(data.clone())]);
        }

        let mut steps = Vec::with_capacity(4);
        if self.processor.registry.failure_count(&self.domain.uid) > 0 {
            steps.push(events.create_event_step(EventItem::ProcessingRetrying));
        }
        steps.push(starting);
        steps.push(
            self.body
                .clone()
                .unwrap_or_else(|| self.processor.reconciler.steps(&self.domain)),
        );
        steps.push(events.create_event_step(EventItem::ProcessingCompleted));
        Step::chain(steps)
    }

    /// Run the attempt to its end
    ///
    /// A failure is reported through FAILED (and ABORTED, once the failure
    /// is permanent or the failure limit is reached) before it is returned.
    pub async fn execute(self) -> Result<AttemptOutcome, Error> {
        let started = Instant::now();
        let processor = &self.processor;
        let uid = self.domain.uid.as_str();

        let mut packet = Packet::for_domain(self.domain.clone());
        let attempt = packet.attempt_id();
        let guard = processor.registry.begin(uid, attempt);
        let steps = self.create_steps();
        info!(domain = %self.domain, %attempt, steps = ?steps.names(), "starting make-right");

        let result = processor
            .engine
            .run_with_cancel(steps, &mut packet, guard.token())
            .await;

        let label = match &result {
            Ok(outcome) => outcome.as_str(),
            Err(_) => "failed",
        };
        metrics::record_attempt(label, started.elapsed().as_secs_f64());

        match result {
            Ok(AttemptOutcome::Cancelled) => {
                info!(domain = %self.domain, %attempt, "make-right cancelled");
                Ok(AttemptOutcome::Cancelled)
            }
            Ok(outcome) => {
                processor.registry.reset_failures(uid);
                info!(domain = %self.domain, %attempt, outcome = outcome.as_str(), "make-right finished");
                Ok(outcome)
            }
            Err(e) if e.is_configuration() => {
                warn!(
                    domain = %self.domain,
                    %attempt,
                    error = %e,
                    "operator identity not configured, failure cannot be reported"
                );
                Err(e)
            }
            Err(e) => {
                let failures = processor.registry.record_failure(uid);
                let abort = !e.is_retryable() || failures >= processor.failure_retry_limit;
                warn!(
                    domain = %self.domain,
                    %attempt,
                    error = %e,
                    failures,
                    abort,
                    "make-right failed"
                );

                let report = create_failure_related_steps(
                    &processor.events,
                    e.reason(),
                    &failure_text(&e),
                    abort,
                    None,
                );
                if let Err(report_err) = processor
                    .engine
                    .run_with_cancel(report, &mut packet, guard.token())
                    .await
                {
                    warn!(domain = %self.domain, %attempt, error = %report_err, "failed to report failure");
                }
                Err(e)
            }
        }
    }
}

/// Text embedded in FAILED and ABORTED messages
fn failure_text(error: &Error) -> String {
    match error {
        Error::Step { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
