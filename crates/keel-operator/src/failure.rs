//! Steps reporting a failed attempt

use keel_events::{EventData, EventHelper, EventItem};
use keel_work::Step;

/// Steps emitting PROCESSING_FAILED, then PROCESSING_ABORTED when `abort` is set
///
/// The ABORTED event embeds the failure text recorded by the FAILED one.
/// Every returned step is critical, so the events are still emitted when the
/// attempt has been cancelled. `next`, if given, runs afterwards.
pub fn create_failure_related_steps(
    helper: &EventHelper,
    reason: &str,
    message: &str,
    abort: bool,
    next: Option<Step>,
) -> Step {
    let mut steps = vec![helper.create_event_step(
        EventData::new(EventItem::ProcessingFailed)
            .reason(reason)
            .message(message),
    )];
    if abort {
        steps.push(helper.create_event_step(EventItem::ProcessingAborted));
    }

    let failure = Step::chain(steps).critical();
    match next {
        Some(next) => failure.then(next),
        None => failure,
    }
}
