// * Cluster Insights
// * Diagnostic gather engine for a cluster telemetry collector: filtered events,
// * bounded container logs of unhealthy operators, a container image census and
// * failed connectivity-check summaries, all emitted as uniform records.

pub mod cluster;
pub mod config;
pub mod engine;
pub mod ops;
pub mod record;

pub use cluster::{CancellationToken, GatherContext, GatherError, KubeCluster};
pub use config::GatherConfig;
pub use engine::ClusterGatherer;
pub use record::{GatherOutcome, Item, Record};
