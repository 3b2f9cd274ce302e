//! Stories about lifecycle event emission inside one attempt

use keel_common::{
    Error, CREATED_BY_OPERATOR_LABEL, DOMAIN_UID_LABEL, OPERATOR_COMPONENT,
};
use keel_events::{EventData, EventItem};
use keel_operator::create_failure_related_steps;
use keel_work::{Packet, Step};

use super::helpers::*;

async fn run(harness: &Harness, steps: Step) -> Packet {
    let mut packet = Packet::for_domain(domain());
    harness
        .processor
        .engine()
        .run(steps, &mut packet)
        .await
        .unwrap();
    packet
}

#[tokio::test]
async fn starting_event_describes_the_domain_and_the_operator() {
    let harness = Harness::new();
    let step = harness.helper().create_event_step(EventItem::ProcessingStarting);
    run(&harness, step).await;

    let records = harness.sink.records_for(EventItem::ProcessingStarting);
    assert_eq!(records.len(), 1);
    let record = &records[0];

    assert_eq!(record.namespace(), NS);
    assert_eq!(
        record.message(),
        "Creating or updating Kubernetes presence for WebLogic Domain with UID uid1"
    );
    assert_eq!(record.labels().get(DOMAIN_UID_LABEL).map(String::as_str), Some(UID));
    assert_eq!(
        record.labels().get(CREATED_BY_OPERATOR_LABEL).map(String::as_str),
        Some("true")
    );
    assert_eq!(record.involved_object().name, UID);
    assert_eq!(record.involved_object().namespace, NS);
    assert_eq!(record.involved_object().kind, "Domain");
    assert_eq!(record.reporting_component(), OPERATOR_COMPONENT);
    assert_eq!(record.reporting_instance(), OPERATOR_POD_NAME);
    assert_eq!(record.operator_namespace(), OPERATOR_NAMESPACE);
}

#[tokio::test]
async fn completed_follows_starting_within_an_attempt() {
    let harness = Harness::new();
    let helper = harness.helper();
    let steps = Step::chain([
        helper.create_event_step(EventItem::ProcessingStarting),
        helper.create_event_step(EventItem::ProcessingCompleted),
    ]);
    let packet = run(&harness, steps).await;

    assert_eq!(harness.sink.occurrences(EventItem::ProcessingStarting), 1);
    assert_eq!(harness.sink.occurrences(EventItem::ProcessingCompleted), 1);
    let completed = &harness.sink.records_for(EventItem::ProcessingCompleted)[0];
    assert_eq!(
        completed.message(),
        "Successfully completed processing domain resource uid1"
    );
    assert_eq!(
        completed.labels().get(DOMAIN_UID_LABEL).map(String::as_str),
        Some(UID)
    );
    assert_eq!(
        packet.markers().history(),
        ["DomainProcessingStarting", "DomainProcessingCompleted"]
    );
}

#[tokio::test]
async fn completed_alone_is_never_emitted() {
    let harness = Harness::new();
    let step = harness.helper().create_event_step(EventItem::ProcessingCompleted);
    let packet = run(&harness, step).await;

    assert!(!harness.sink.contains(EventItem::ProcessingCompleted));
    assert!(!packet.markers().has_completed());
}

#[tokio::test]
async fn completed_in_a_fresh_attempt_needs_its_own_starting() {
    let harness = Harness::new();
    run(
        &harness,
        harness.helper().create_event_step(EventItem::ProcessingStarting),
    )
    .await;
    run(
        &harness,
        harness.helper().create_event_step(EventItem::ProcessingCompleted),
    )
    .await;

    assert!(!harness.sink.contains(EventItem::ProcessingCompleted));
}

#[tokio::test]
async fn retrying_then_starting_then_completed_yields_one_completed() {
    let harness = Harness::new();
    let helper = harness.helper();
    let steps = Step::chain([
        helper.create_event_step(EventItem::ProcessingRetrying),
        helper.create_event_step(EventItem::ProcessingStarting),
        helper.create_event_step(EventItem::ProcessingCompleted),
    ]);
    run(&harness, steps).await;

    assert_eq!(
        harness.sink.reasons(),
        vec![
            "DomainProcessingRetrying",
            "DomainProcessingStarting",
            "DomainProcessingCompleted"
        ]
    );
    assert_eq!(harness.sink.occurrences(EventItem::ProcessingCompleted), 1);
    assert_eq!(
        harness.sink.records_for(EventItem::ProcessingRetrying)[0].message(),
        "Retrying the processing of domain resource uid1 after one or more failed attempts"
    );
}

#[tokio::test]
async fn failure_related_steps_report_the_failure_text() {
    let harness = Harness::new();
    let steps = create_failure_related_steps(
        harness.helper(),
        "Kubernetes",
        "Test this failure",
        false,
        None,
    );
    let packet = run(&harness, steps).await;

    let failed = &harness.sink.records_for(EventItem::ProcessingFailed)[0];
    assert_eq!(
        failed.message(),
        "Failed to complete processing domain resource uid1 due to: Test this failure, \
         the processing will be retried if needed"
    );
    assert!(!harness.sink.contains(EventItem::ProcessingAborted));
    assert_eq!(
        packet.markers().failure().map(|f| f.reason.as_str()),
        Some("Kubernetes")
    );
}

#[tokio::test]
async fn aborted_after_failed_embeds_the_text() {
    let harness = Harness::new();
    let helper = harness.helper();
    let steps = Step::chain([
        helper.create_event_step(
            EventData::new(EventItem::ProcessingFailed).message("Test this failure"),
        ),
        helper.create_event_step(
            EventData::new(EventItem::ProcessingAborted).message("Test this failure"),
        ),
    ]);
    run(&harness, steps).await;

    let aborted = &harness.sink.records_for(EventItem::ProcessingAborted)[0];
    assert!(aborted.message().contains("Test this failure"));
    assert!(aborted.message().contains(UID));
    assert_eq!(
        aborted.message(),
        "Stop processing domain resource uid1 due to: Test this failure, \
         the processing will not be retried"
    );
}

#[tokio::test]
async fn aborted_without_failed_is_suppressed() {
    let harness = Harness::new();
    let step = harness.helper().create_event_step(
        EventData::new(EventItem::ProcessingAborted).message("Test this failure"),
    );
    run(&harness, step).await;

    assert!(harness.sink.events().is_empty());
}

#[tokio::test]
async fn resource_events_need_no_prior_state() {
    let harness = Harness::new();
    let helper = harness.helper();
    let steps = Step::chain([
        helper.create_event_step(EventItem::ResourceCreated),
        helper.create_event_step(EventItem::ResourceChanged),
        helper.create_event_step(EventItem::ResourceDeleted),
    ]);
    run(&harness, steps).await;

    let message = |item| harness.sink.records_for(item)[0].message().to_string();
    assert_eq!(message(EventItem::ResourceCreated), "Domain resource uid1 was created");
    assert_eq!(message(EventItem::ResourceChanged), "Domain resource uid1 was changed");
    assert_eq!(message(EventItem::ResourceDeleted), "Domain resource uid1 was deleted");
}

#[tokio::test]
async fn namespace_watch_events_point_at_the_namespace() {
    let harness = Harness::new();
    harness.processor.start_namespace_watching(NS).await.unwrap();
    harness.processor.stop_namespace_watching(NS).await.unwrap();

    let started = &harness.sink.records_for(EventItem::NamespaceWatchingStarted)[0];
    assert_eq!(started.message(), "Started watching namespace ns1");
    assert_eq!(started.namespace(), NS);
    assert_eq!(started.involved_object().kind, "Namespace");
    assert_eq!(started.involved_object().name, NS);
    assert!(started.labels().get(DOMAIN_UID_LABEL).is_none());
    assert_eq!(
        started.labels().get(CREATED_BY_OPERATOR_LABEL).map(String::as_str),
        Some("true")
    );

    let stopped = &harness.sink.records_for(EventItem::NamespaceWatchingStopped)[0];
    assert_eq!(stopped.message(), "Stopped watching namespace ns1");
    assert_eq!(stopped.reporting_instance(), OPERATOR_POD_NAME);
}

#[tokio::test]
async fn repeated_emission_across_attempts_is_merged_by_the_sink() {
    let harness = Harness::new();
    for _ in 0..3 {
        run(
            &harness,
            harness.helper().create_event_step(EventItem::ProcessingStarting),
        )
        .await;
    }

    let events = harness.sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].count, 3);
}

#[tokio::test]
async fn reporting_instance_is_read_at_emission_time() {
    let harness = Harness::new();
    run(
        &harness,
        harness.helper().create_event_step(EventItem::ResourceCreated),
    )
    .await;

    harness.identity.set_pod_name(Some("keel-operator-5678".to_string()));
    run(
        &harness,
        harness.helper().create_event_step(EventItem::ResourceChanged),
    )
    .await;

    assert_eq!(
        harness.sink.records_for(EventItem::ResourceCreated)[0].reporting_instance(),
        OPERATOR_POD_NAME
    );
    assert_eq!(
        harness.sink.records_for(EventItem::ResourceChanged)[0].reporting_instance(),
        "keel-operator-5678"
    );
}

#[tokio::test]
async fn missing_operator_namespace_fails_the_step() {
    let harness = Harness::new();
    harness.identity.set_namespace(None);

    let mut packet = Packet::for_domain(domain());
    let err = harness
        .processor
        .engine()
        .run(
            harness.helper().create_event_step(EventItem::ProcessingStarting),
            &mut packet,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ConfigurationMissing { .. }));
    assert!(harness.sink.events().is_empty());
}
