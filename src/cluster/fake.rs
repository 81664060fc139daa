// * In-memory cluster for exercising the gatherers without an API server.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::cluster::errors::GatherError;
use crate::cluster::models::{ClusterOperator, PodNetworkConnectivityCheck};
use crate::cluster::ports::{
    EventLister, LogBuffer, LogRequest, LogStreamer, OperatorLister, PodLister, PodPage,
    ProbeLister,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LogKey {
    namespace: String,
    pod: String,
    container: String,
    previous: bool,
}

/// A log fetch as seen by the fake, kept for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLogRequest {
    pub namespace: String,
    pub pod: String,
    pub request: LogRequest,
}

/// Fixture cluster implementing every capability trait.
#[derive(Debug, Default)]
pub struct InMemoryCluster {
    operators: Vec<ClusterOperator>,
    operators_missing: bool,
    operators_failing: bool,
    pods: Vec<Pod>,
    events: HashMap<String, Vec<Event>>,
    logs: HashMap<LogKey, String>,
    checks: Vec<PodNetworkConnectivityCheck>,
    checks_missing: bool,
    checks_failing: bool,
    failing_pod_namespaces: HashSet<String>,
    failing_event_namespaces: HashSet<String>,
    failing_pod_pages: bool,
    log_requests: Mutex<Vec<RecordedLogRequest>>,
    page_requests: AtomicUsize,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operator(mut self, operator: ClusterOperator) -> Self {
        self.operators.push(operator);
        self
    }

    /// Makes the operator listing answer "not found".
    pub fn without_cluster_operators(mut self) -> Self {
        self.operators_missing = true;
        self
    }

    pub fn with_failing_cluster_operators(mut self) -> Self {
        self.operators_failing = true;
        self
    }

    pub fn with_pod(mut self, pod: Pod) -> Self {
        self.pods.push(pod);
        self
    }

    pub fn with_pods(mut self, pods: impl IntoIterator<Item = Pod>) -> Self {
        self.pods.extend(pods);
        self
    }

    pub fn with_events(mut self, namespace: &str, events: Vec<Event>) -> Self {
        self.events
            .entry(namespace.to_string())
            .or_default()
            .extend(events);
        self
    }

    pub fn with_log(
        mut self,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
        body: impl Into<String>,
    ) -> Self {
        let key = LogKey {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: container.to_string(),
            previous,
        };
        self.logs.insert(key, body.into());
        self
    }

    pub fn with_connectivity_check(mut self, check: PodNetworkConnectivityCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// Makes the connectivity check listing answer "not found".
    pub fn without_connectivity_checks(mut self) -> Self {
        self.checks_missing = true;
        self
    }

    pub fn with_failing_connectivity_checks(mut self) -> Self {
        self.checks_failing = true;
        self
    }

    pub fn with_failing_pod_list(mut self, namespace: &str) -> Self {
        self.failing_pod_namespaces.insert(namespace.to_string());
        self
    }

    pub fn with_failing_event_list(mut self, namespace: &str) -> Self {
        self.failing_event_namespaces.insert(namespace.to_string());
        self
    }

    pub fn with_failing_pod_pages(mut self) -> Self {
        self.failing_pod_pages = true;
        self
    }

    /// Every log fetch issued so far, in order.
    pub fn log_requests(&self) -> Vec<RecordedLogRequest> {
        self.log_requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of cluster-wide pod pages served so far.
    pub fn page_requests(&self) -> usize {
        self.page_requests.load(Ordering::Relaxed)
    }

    fn pod_namespace(pod: &Pod) -> &str {
        pod.metadata.namespace.as_deref().unwrap_or_default()
    }
}

// * Keeps the last `tail` lines of a log, newline terminators included.
fn tail_lines(body: &str, tail: i64) -> &str {
    if tail < 0 {
        return body;
    }
    let tail = tail as usize;
    if tail == 0 {
        return "";
    }
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(
            body.match_indices('\n')
                .map(|(idx, _)| idx + 1)
                .filter(|start| *start < body.len()),
        )
        .collect();
    if line_starts.len() <= tail {
        return body;
    }
    &body[line_starts[line_starts.len() - tail]..]
}

#[async_trait]
impl OperatorLister for InMemoryCluster {
    async fn list_cluster_operators(&self) -> Result<Vec<ClusterOperator>, GatherError> {
        if self.operators_missing {
            return Err(GatherError::NotFound("clusteroperators".to_string()));
        }
        if self.operators_failing {
            return Err(GatherError::Upstream(
                "cluster operators are unavailable".to_string(),
            ));
        }
        Ok(self.operators.clone())
    }
}

#[async_trait]
impl PodLister for InMemoryCluster {
    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, GatherError> {
        if self.failing_pod_namespaces.contains(namespace) {
            return Err(GatherError::Upstream(format!(
                "pods in namespace {namespace} are unavailable"
            )));
        }
        Ok(self
            .pods
            .iter()
            .filter(|pod| Self::pod_namespace(pod) == namespace)
            .cloned()
            .collect())
    }

    async fn list_pods_page(
        &self,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<PodPage, GatherError> {
        self.page_requests.fetch_add(1, Ordering::Relaxed);
        if self.failing_pod_pages {
            return Err(GatherError::Upstream("pod listing unavailable".to_string()));
        }

        let offset = match continue_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| GatherError::Upstream(format!("invalid continue token {token}")))?,
            None => 0,
        };
        let end = offset.saturating_add(limit as usize).min(self.pods.len());
        let items = self.pods.get(offset..end).unwrap_or_default().to_vec();
        let continue_token = (end < self.pods.len()).then(|| end.to_string());

        Ok(PodPage {
            items,
            continue_token,
        })
    }
}

#[async_trait]
impl EventLister for InMemoryCluster {
    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, GatherError> {
        if self.failing_event_namespaces.contains(namespace) {
            return Err(GatherError::Upstream(format!(
                "events in namespace {namespace} are unavailable"
            )));
        }
        Ok(self.events.get(namespace).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl LogStreamer for InMemoryCluster {
    async fn stream_logs(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
        buf: &mut LogBuffer,
    ) -> Result<(), GatherError> {
        self.log_requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedLogRequest {
                namespace: namespace.to_string(),
                pod: pod.to_string(),
                request: request.clone(),
            });

        let key = LogKey {
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            container: request.container.clone(),
            previous: request.previous,
        };
        let body = self.logs.get(&key).ok_or_else(|| {
            GatherError::NotFound(format!(
                "log for container {} of pod {namespace}/{pod}",
                request.container
            ))
        })?;

        let tail = tail_lines(body, request.tail_lines).as_bytes();
        let limit = usize::try_from(request.limit_bytes).unwrap_or(0).min(tail.len());
        buf.write(&tail[..limit]);
        Ok(())
    }
}

#[async_trait]
impl ProbeLister for InMemoryCluster {
    async fn list_connectivity_checks(
        &self,
    ) -> Result<Vec<PodNetworkConnectivityCheck>, GatherError> {
        if self.checks_missing {
            return Err(GatherError::NotFound(
                "podnetworkconnectivitychecks".to_string(),
            ));
        }
        if self.checks_failing {
            return Err(GatherError::Upstream(
                "connectivity checks are unavailable".to_string(),
            ));
        }
        Ok(self.checks.clone())
    }
}
