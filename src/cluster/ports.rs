// * Narrow capability interfaces the gather engine depends on.
// * `KubeCluster` implements them over the API server, `InMemoryCluster` in memory.

use async_trait::async_trait;
use futures::io::{AsyncRead, AsyncReadExt};
use k8s_openapi::api::core::v1::{Event, Pod};

use crate::cluster::errors::GatherError;
use crate::cluster::models::{ClusterOperator, PodNetworkConnectivityCheck};

/// One page of a cluster-wide pod listing
#[derive(Debug, Clone, Default)]
pub struct PodPage {
    pub items: Vec<Pod>,
    /// Set when more pages remain
    pub continue_token: Option<String>,
}

/// Options for a single container log fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRequest {
    pub container: String,
    pub previous: bool,
    pub tail_lines: i64,
    pub limit_bytes: i64,
    pub timestamps: bool,
}

/// Reusable byte buffer with a hard capacity.
///
/// The capacity doubles as the byte limit of every fetch that fills it.
#[derive(Debug)]
pub struct LogBuffer {
    data: Vec<u8>,
    capacity: usize,
}

impl LogBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Appends as much of `bytes` as still fits; the rest is dropped.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let room = self.capacity.saturating_sub(self.data.len());
        let taken = room.min(bytes.len());
        self.data.extend_from_slice(&bytes[..taken]);
        taken
    }

    /// Drains a log stream into the buffer, stopping silently at capacity.
    pub async fn fill_from<R>(&mut self, reader: R) -> Result<usize, GatherError>
    where
        R: AsyncRead + Unpin,
    {
        let room = self.capacity.saturating_sub(self.data.len()) as u64;
        let read = reader.take(room).read_to_end(&mut self.data).await?;
        Ok(read)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Buffer contents as text; invalid UTF-8 (e.g. a cut multi-byte char) is replaced.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

#[async_trait]
pub trait OperatorLister: Send + Sync {
    async fn list_cluster_operators(&self) -> Result<Vec<ClusterOperator>, GatherError>;
}

#[async_trait]
pub trait PodLister: Send + Sync {
    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, GatherError>;

    async fn list_pods_page(
        &self,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<PodPage, GatherError>;
}

#[async_trait]
pub trait EventLister: Send + Sync {
    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, GatherError>;
}

#[async_trait]
pub trait LogStreamer: Send + Sync {
    /// Writes the requested log into `buf`, at most `buf.capacity()` bytes.
    async fn stream_logs(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
        buf: &mut LogBuffer,
    ) -> Result<(), GatherError>;
}

#[async_trait]
pub trait ProbeLister: Send + Sync {
    async fn list_connectivity_checks(
        &self,
    ) -> Result<Vec<PodNetworkConnectivityCheck>, GatherError>;
}
