//! Stories about whole make-right attempts

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use keel_common::retry::RetryConfig;
use keel_common::Error;
use keel_events::EventItem;
use keel_operator::ProcessorConfig;
use keel_work::{AttemptOutcome, NextAction, Step};

use super::helpers::*;

#[tokio::test]
async fn successful_attempt_reports_starting_and_completed() {
    let harness = Harness::new();
    let outcome = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(ok_body())
        .execute()
        .await
        .unwrap();

    assert_eq!(outcome, AttemptOutcome::Completed);
    assert_eq!(
        harness.sink.reasons(),
        vec!["DomainProcessingStarting", "DomainProcessingCompleted"]
    );
    assert!(!harness.processor.registry().is_in_flight(UID));
}

#[tokio::test]
async fn event_override_reports_starting_then_the_event() {
    let cases = [
        (EventItem::ProcessingRetrying, "Retrying the processing of domain resource uid1 after one or more failed attempts"),
        (EventItem::ResourceCreated, "Domain resource uid1 was created"),
        (EventItem::ResourceChanged, "Domain resource uid1 was changed"),
        (EventItem::ResourceDeleted, "Domain resource uid1 was deleted"),
    ];

    for (item, expected) in cases {
        let harness = Harness::new();
        harness
            .processor
            .create_make_right_operation(domain())
            .with_event_data(item, None)
            .execute()
            .await
            .unwrap();

        assert_eq!(
            harness.sink.reasons(),
            vec!["DomainProcessingStarting", item.reason()],
            "{item:?}"
        );
        assert_eq!(harness.sink.records_for(item)[0].message(), expected);
        assert!(!harness.sink.contains(EventItem::ProcessingCompleted));
    }
}

#[tokio::test]
async fn failing_body_reports_failed_but_not_completed() {
    let harness = Harness::new();
    let err = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(failing_body(|| Error::step("body", "Test this failure")))
        .execute()
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(
        harness.sink.reasons(),
        vec!["DomainProcessingStarting", "DomainProcessingFailed"]
    );
    let failed = &harness.sink.records_for(EventItem::ProcessingFailed)[0];
    assert!(failed.message().contains("Test this failure"));
    assert_eq!(harness.processor.registry().failure_count(UID), 1);
}

#[tokio::test]
async fn permanent_failure_is_aborted_at_once() {
    let harness = Harness::new();
    harness
        .processor
        .create_make_right_operation(domain())
        .with_body(failing_body(|| Error::step_permanent("body", "Test this failure")))
        .execute()
        .await
        .unwrap_err();

    let aborted = &harness.sink.records_for(EventItem::ProcessingAborted)[0];
    assert_eq!(
        aborted.message(),
        "Stop processing domain resource uid1 due to: Test this failure, \
         the processing will not be retried"
    );
}

#[tokio::test]
async fn reaching_the_failure_limit_aborts() {
    // failure_retry_limit is 3 in the default harness
    let harness = Harness::new();
    for attempt in 1..=3u32 {
        harness
            .processor
            .create_make_right_operation(domain())
            .with_body(failing_body(|| Error::step("body", "pod rejected")))
            .execute()
            .await
            .unwrap_err();

        assert_eq!(
            harness.sink.contains(EventItem::ProcessingAborted),
            attempt == 3,
            "attempt {attempt}"
        );
    }
    assert_eq!(harness.processor.registry().failure_count(UID), 3);
}

#[tokio::test]
async fn attempt_after_failure_reports_retrying_first_and_resets() {
    let harness = Harness::new();
    harness
        .processor
        .create_make_right_operation(domain())
        .with_body(failing_body(|| Error::step("body", "pod rejected")))
        .execute()
        .await
        .unwrap_err();
    harness.sink.clear();

    harness
        .processor
        .create_make_right_operation(domain())
        .with_body(ok_body())
        .execute()
        .await
        .unwrap();

    assert_eq!(
        harness.sink.reasons(),
        vec![
            "DomainProcessingRetrying",
            "DomainProcessingStarting",
            "DomainProcessingCompleted"
        ]
    );
    assert_eq!(harness.processor.registry().failure_count(UID), 0);

    harness.sink.clear();
    harness
        .processor
        .create_make_right_operation(domain())
        .execute()
        .await
        .unwrap();
    assert!(!harness.sink.contains(EventItem::ProcessingRetrying));
}

#[tokio::test]
async fn missing_identity_skips_failure_reporting() {
    let harness = Harness::new();
    harness.identity.set_pod_name(None);

    let err = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(ok_body())
        .execute()
        .await
        .unwrap_err();

    assert!(err.is_configuration());
    assert!(harness.sink.events().is_empty());
    assert_eq!(harness.processor.registry().failure_count(UID), 0);
}

#[tokio::test(start_paused = true)]
async fn exhausted_step_retries_are_reported_as_failure() {
    let harness = Harness::with_config(ProcessorConfig {
        retry: RetryConfig::with_max_retries(2),
        failure_retry_limit: 5,
    });
    let flaky = Step::sync_fn("wait-for-pods", |_| {
        Ok(NextAction::RetryAfter(Duration::from_millis(10)))
    });

    let err = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(flaky)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::AttemptFailed { retries: 2, .. }));
    let failed = &harness.sink.records_for(EventItem::ProcessingFailed)[0];
    assert!(failed.message().contains("wait-for-pods"));
    assert!(!harness.sink.contains(EventItem::ProcessingAborted));
}

#[tokio::test]
async fn cancelled_attempt_skips_completed() {
    let harness = Harness::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let operation = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(gated_body(entered.clone(), release.clone(), || {
            Ok(NextAction::Continue)
        }));
    let handle = tokio::spawn(operation.execute());

    entered.notified().await;
    assert!(harness.processor.cancel_attempt(UID));
    release.notify_one();

    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, AttemptOutcome::Cancelled);
    assert!(harness.sink.contains(EventItem::ProcessingStarting));
    assert!(!harness.sink.contains(EventItem::ProcessingCompleted));
    assert!(!harness.processor.registry().is_in_flight(UID));
}

#[tokio::test]
async fn failure_after_cancellation_is_still_reported() {
    let harness = Harness::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let operation = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(gated_body(entered.clone(), release.clone(), || {
            Err(Error::step("gated-body", "Test this failure"))
        }));
    let handle = tokio::spawn(operation.execute());

    entered.notified().await;
    harness.processor.cancel_attempt(UID);
    release.notify_one();

    handle.await.unwrap().unwrap_err();
    let failed = &harness.sink.records_for(EventItem::ProcessingFailed)[0];
    assert!(failed.message().contains("Test this failure"));
}

#[tokio::test]
async fn newer_attempt_cancels_the_older_one() {
    let harness = Harness::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let older = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(gated_body(entered.clone(), release.clone(), || {
            Ok(NextAction::Continue)
        }));
    let older = tokio::spawn(older.execute());
    entered.notified().await;

    let newer = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(ok_body())
        .execute()
        .await
        .unwrap();
    assert_eq!(newer, AttemptOutcome::Completed);

    release.notify_one();
    assert_eq!(older.await.unwrap().unwrap(), AttemptOutcome::Cancelled);

    assert_eq!(harness.sink.occurrences(EventItem::ProcessingStarting), 2);
    assert_eq!(harness.sink.occurrences(EventItem::ProcessingCompleted), 1);
    assert!(!harness.processor.registry().is_in_flight(UID));
}

#[tokio::test]
async fn deleting_a_domain_cancels_and_reports_deletion() {
    let harness = Harness::new();
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());

    let running = harness
        .processor
        .create_make_right_operation(domain())
        .with_body(gated_body(entered.clone(), release.clone(), || {
            Ok(NextAction::Continue)
        }));
    let running = tokio::spawn(running.execute());
    entered.notified().await;

    let outcome = harness.processor.on_domain_deleted(domain()).await.unwrap();
    assert_eq!(outcome, AttemptOutcome::Completed);

    release.notify_one();
    assert_eq!(running.await.unwrap().unwrap(), AttemptOutcome::Cancelled);

    assert!(harness.sink.contains(EventItem::ResourceDeleted));
    assert!(!harness.sink.contains(EventItem::ProcessingCompleted));
}

#[tokio::test]
async fn attempts_for_different_domains_run_concurrently() {
    let harness = Harness::new();
    let handles: Vec<_> = ["uid1", "uid2", "uid3"]
        .into_iter()
        .map(|uid| {
            harness
                .processor
                .spawn_make_right(keel_common::DomainRef::new(uid, NS))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), AttemptOutcome::Completed);
    }
    assert_eq!(harness.sink.records_for(EventItem::ProcessingCompleted).len(), 3);
    assert_eq!(harness.processor.registry().in_flight_count(), 0);
}
