// * Diagnostic gather engine
// * Event pipeline, health predicates, log harvester, operator walk,
// * image census and connectivity-check aggregation.

pub mod connectivity;
pub mod events;
pub mod gatherer;
pub mod image_ref;
pub mod images;
pub mod logs;
pub mod operators;
pub mod pod_health;

pub use connectivity::{aggregate_unsuccessful, UnsuccessfulProbes, CONNECTIVITY_CHECKS_RECORD};
pub use events::{
    compact_events, events_for_interval, filter_abnormal_events, filter_events, CompactedEvent,
    CompactedEventList, EventFilter, EventSource,
};
pub use gatherer::ClusterGatherer;
pub use image_ref::{image_identity, ImageReference};
pub use images::{ContainerImageSet, ContainerInfo, ImageCounts, PodsWithAge, RUNNING_CONTAINERS_RECORD};
pub use logs::{compress_stack_trace, LogHarvester};
