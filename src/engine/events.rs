// * Event pipeline
// * Raw namespace events -> recency filter -> optional type filter -> compact, time-sorted list.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Event;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::cluster::context::GatherContext;
use crate::cluster::errors::GatherError;
use crate::cluster::ports::EventLister;
use crate::cluster::timestamps::{to_utc, window_start};
use crate::config::constants::PLATFORM_NAMESPACE_PREFIX;
use crate::record::Record;

const NORMAL_EVENT_TYPE: &str = "Normal";

/// Which event types survive filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    Any,
    /// Drops events of type `Normal`
    Warning,
}

/// Five-field projection of an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactedEvent {
    pub namespace: String,
    pub last_timestamp: DateTime<Utc>,
    pub reason: String,
    pub message: String,
    #[serde(rename = "type")]
    pub type_: String,
}

/// Compacted events sorted ascending by `last_timestamp`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactedEventList {
    pub items: Vec<CompactedEvent>,
}

impl CompactedEventList {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Anything the pipeline can filter and compact.
///
/// Implemented for raw events and for already compacted ones, so compaction
/// can be re-applied to its own output.
pub trait EventSource {
    /// Last-observed instant, falling back to the event series; `None` when unknown
    fn last_observed(&self) -> Option<DateTime<Utc>>;

    fn event_type(&self) -> &str;

    fn compact(&self) -> Option<CompactedEvent>;
}

impl EventSource for Event {
    fn last_observed(&self) -> Option<DateTime<Utc>> {
        match &self.last_timestamp {
            Some(timestamp) => to_utc(timestamp),
            // * Zero primary timestamp: try the event series
            None => self
                .series
                .as_ref()
                .and_then(|series| series.last_observed_time.as_ref())
                .and_then(to_utc),
        }
    }

    fn event_type(&self) -> &str {
        self.type_.as_deref().unwrap_or_default()
    }

    fn compact(&self) -> Option<CompactedEvent> {
        Some(CompactedEvent {
            namespace: self.metadata.namespace.clone().unwrap_or_default(),
            last_timestamp: self.last_observed()?,
            reason: self.reason.clone().unwrap_or_default(),
            message: self.message.clone().unwrap_or_default(),
            type_: self.event_type().to_string(),
        })
    }
}

impl EventSource for CompactedEvent {
    fn last_observed(&self) -> Option<DateTime<Utc>> {
        Some(self.last_timestamp)
    }

    fn event_type(&self) -> &str {
        &self.type_
    }

    fn compact(&self) -> Option<CompactedEvent> {
        Some(self.clone())
    }
}

/// True when the event was last observed strictly after `oldest`
pub fn is_event_new<E: EventSource>(event: &E, oldest: DateTime<Utc>) -> bool {
    event
        .last_observed()
        .is_some_and(|observed| observed > oldest)
}

pub fn is_event_abnormal<E: EventSource>(event: &E) -> bool {
    event.event_type() != NORMAL_EVENT_TYPE
}

/// Keeps events observed within the trailing `interval` ending at `now`
pub fn events_for_interval<E: EventSource + Clone>(
    interval: Duration,
    events: &[E],
    now: DateTime<Utc>,
) -> Vec<E> {
    let oldest = window_start(now, interval);
    events
        .iter()
        .filter(|event| is_event_new(*event, oldest))
        .cloned()
        .collect()
}

/// Keeps events whose type is not `Normal`
pub fn filter_abnormal_events<E: EventSource + Clone>(events: &[E]) -> Vec<E> {
    events
        .iter()
        .filter(|event| is_event_abnormal(*event))
        .cloned()
        .collect()
}

/// Projects events to the compact schema, sorted by last-observed time.
///
/// Events without any resolvable timestamp are dropped. The sort is stable.
pub fn compact_events<E: EventSource>(events: &[E]) -> CompactedEventList {
    let mut items: Vec<CompactedEvent> = events.iter().filter_map(EventSource::compact).collect();
    items.sort_by_key(|event| event.last_timestamp);
    CompactedEventList { items }
}

/// Full pipeline: recency, then mode, then compaction
pub fn filter_events<E: EventSource + Clone>(
    events: &[E],
    interval: Duration,
    mode: EventFilter,
    now: DateTime<Utc>,
) -> CompactedEventList {
    let recent = events_for_interval(interval, events, now);
    let retained = match mode {
        EventFilter::Any => recent,
        EventFilter::Warning => filter_abnormal_events(&recent),
    };
    compact_events(&retained)
}

/// Lists, filters and records the events of one platform namespace.
///
/// Non-platform namespaces are skipped without touching the API. No record
/// is produced when nothing recent remains.
pub async fn gather_namespace_events(
    ctx: &GatherContext,
    lister: &dyn EventLister,
    namespace: &str,
    interval: Duration,
    mode: EventFilter,
) -> Result<Vec<Record>, GatherError> {
    // ! Privacy guard: never read events outside platform namespaces
    if !namespace.starts_with(PLATFORM_NAMESPACE_PREFIX) {
        return Ok(Vec::new());
    }

    let events = ctx.guard(lister.list_events(namespace)).await?;
    let compacted = filter_events(&events, interval, mode, Utc::now());
    debug!(
        namespace = namespace,
        listed = events.len(),
        retained = compacted.len(),
        "Filtered namespace events"
    );
    if compacted.is_empty() {
        return Ok(Vec::new());
    }

    Ok(vec![Record::json(format!("events/{namespace}"), &compacted)?])
}
