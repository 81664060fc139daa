// * Cluster access layer
// * Capability traits, their API-server and in-memory implementations,
// * cancellation and the models for platform resources.

pub mod context;
pub mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod fake;
pub mod kube_client;
pub mod models;
pub mod ports;
pub mod timestamps;

pub use context::{CancellationToken, GatherContext};
pub use errors::GatherError;
#[cfg(any(test, feature = "testing"))]
pub use fake::{InMemoryCluster, RecordedLogRequest};
pub use kube_client::KubeCluster;
pub use models::{
    ClusterOperator, ClusterOperatorStatus, ConnectivityCheckStatus, OperatorCondition,
    PodNetworkConnectivityCheck, ProbeLogEntry, ProbeOutage, RelatedObject,
};
pub use ports::{
    EventLister, LogBuffer, LogRequest, LogStreamer, OperatorLister, PodLister, PodPage,
    ProbeLister,
};
