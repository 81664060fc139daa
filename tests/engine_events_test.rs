use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use cluster_insights::cluster::timestamps::from_utc;
use cluster_insights::cluster::{GatherContext, InMemoryCluster};
use cluster_insights::engine::events::{
    compact_events, events_for_interval, filter_events, gather_namespace_events, CompactedEventList,
    EventFilter,
};
use k8s_openapi::api::core::v1::{Event, EventSeries};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::time::Duration;

// * Test Suite for the Event Pipeline

const HOUR: Duration = Duration::from_secs(3600);

fn now() -> DateTime<Utc> {
    // * API timestamps are second-precision
    Utc::now().trunc_subsecs(0)
}

fn event(namespace: &str, type_: &str, reason: &str, at: DateTime<Utc>) -> Event {
    Event {
        metadata: ObjectMeta {
            namespace: Some(namespace.to_string()),
            name: Some(format!("{reason}.{}", at.timestamp())),
            ..Default::default()
        },
        last_timestamp: from_utc(at),
        reason: Some(reason.to_string()),
        message: Some(format!("{reason} happened")),
        type_: Some(type_.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_warning_mode_drops_normal_events() {
    let now = now();
    let events: Vec<Event> = (1..=3)
        .flat_map(|i| {
            [
                event("openshift-etcd", "Normal", "Pulled", now - TimeDelta::minutes(i)),
                event("openshift-etcd", "Warning", "BackOff", now - TimeDelta::minutes(i)),
            ]
        })
        .collect();

    let compacted = filter_events(&events, HOUR, EventFilter::Warning, now);
    assert_eq!(compacted.len(), 3);
    assert!(compacted.items.iter().all(|e| e.type_ == "Warning"));

    let any = filter_events(&events, HOUR, EventFilter::Any, now);
    assert_eq!(any.len(), 6);
}

#[test]
fn test_series_time_replaces_missing_timestamp() {
    let now = now();
    let observed = now - TimeDelta::minutes(10);
    let mut series_only = event("openshift-etcd", "Warning", "Unhealthy", now);
    series_only.last_timestamp = None;
    series_only.series = Some(EventSeries {
        count: Some(4),
        last_observed_time: from_utc(observed),
    });

    let compacted = filter_events(&[series_only], HOUR, EventFilter::Any, now);
    assert_eq!(compacted.len(), 1);
    assert_eq!(compacted.items[0].last_timestamp, observed);
}

#[test]
fn test_output_is_recent_and_sorted() {
    let now = now();
    let events = vec![
        event("openshift-dns", "Normal", "c", now - TimeDelta::minutes(5)),
        event("openshift-dns", "Normal", "old", now - TimeDelta::minutes(90)),
        event("openshift-dns", "Normal", "a", now - TimeDelta::minutes(50)),
        event("openshift-dns", "Normal", "b", now - TimeDelta::minutes(20)),
    ];

    let compacted = filter_events(&events, HOUR, EventFilter::Any, now);
    let oldest = now - TimeDelta::hours(1);
    assert!(compacted.items.iter().all(|e| e.last_timestamp > oldest));
    assert!(compacted
        .items
        .windows(2)
        .all(|pair| pair[0].last_timestamp <= pair[1].last_timestamp));
    let reasons: Vec<&str> = compacted.items.iter().map(|e| e.reason.as_str()).collect();
    assert_eq!(reasons, vec!["a", "b", "c"]);
}

#[test]
fn test_recency_is_monotone_in_interval() {
    let now = now();
    let events: Vec<Event> = (0..10)
        .map(|i| event("openshift-dns", "Normal", &format!("r{i}"), now - TimeDelta::minutes(i * 17)))
        .collect();

    let short = events_for_interval(Duration::from_secs(30 * 60), &events, now);
    let long = events_for_interval(Duration::from_secs(2 * 3600), &events, now);
    assert!(short.len() <= long.len());
    for kept in &short {
        assert!(long.iter().any(|e| e.metadata.name == kept.metadata.name));
    }
}

#[test]
fn test_compaction_is_idempotent() {
    let now = now();
    let events = vec![
        event("openshift-dns", "Warning", "x", now - TimeDelta::minutes(3)),
        event("openshift-dns", "Normal", "y", now - TimeDelta::minutes(9)),
    ];
    let once = compact_events(&events);
    assert_eq!(compact_events(&once.items), once);
}

#[tokio::test]
async fn test_gather_records_platform_namespace() {
    let now = now();
    let cluster = InMemoryCluster::new().with_events(
        "openshift-etcd",
        vec![
            event("openshift-etcd", "Warning", "BackOff", now - TimeDelta::minutes(2)),
            event("openshift-etcd", "Normal", "Stale", now - TimeDelta::hours(5)),
        ],
    );

    let records = gather_namespace_events(
        &GatherContext::new(),
        &cluster,
        "openshift-etcd",
        HOUR,
        EventFilter::Any,
    )
    .await
    .unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "events/openshift-etcd");
    let list: CompactedEventList = records[0].decode().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list.items[0].reason, "BackOff");
}

#[tokio::test]
async fn test_gather_skips_non_platform_namespace() {
    let now = now();
    // * A failing lister proves the API is never touched
    let cluster = InMemoryCluster::new()
        .with_events("customer", vec![event("customer", "Warning", "x", now)])
        .with_failing_event_list("customer");

    let records = gather_namespace_events(
        &GatherContext::new(),
        &cluster,
        "customer",
        HOUR,
        EventFilter::Any,
    )
    .await
    .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_gather_without_recent_events_emits_nothing() {
    let now = now();
    let cluster = InMemoryCluster::new().with_events(
        "openshift-etcd",
        vec![event("openshift-etcd", "Warning", "Old", now - TimeDelta::days(2))],
    );

    let records = gather_namespace_events(
        &GatherContext::new(),
        &cluster,
        "openshift-etcd",
        HOUR,
        EventFilter::Any,
    )
    .await
    .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_list_failure_propagates() {
    let cluster = InMemoryCluster::new().with_failing_event_list("openshift-etcd");
    let result = gather_namespace_events(
        &GatherContext::new(),
        &cluster,
        "openshift-etcd",
        HOUR,
        EventFilter::Any,
    )
    .await;
    assert!(result.is_err());
}
