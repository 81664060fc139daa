// * API-server backed implementation of the capability traits.
// * Core resources use k8s-openapi types; platform CRDs are listed as
// * `DynamicObject` and re-read into the typed models.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Event, Pod};
use kube::api::{Api, ListParams, LogParams};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::Client;
use tracing::debug;

use crate::cluster::errors::GatherError;
use crate::cluster::models::{
    from_dynamic, ClusterOperator, PodNetworkConnectivityCheck, CLUSTER_OPERATOR_GROUP,
    CLUSTER_OPERATOR_KIND, CLUSTER_OPERATOR_PLURAL, CLUSTER_OPERATOR_VERSION,
    CONNECTIVITY_CHECK_GROUP, CONNECTIVITY_CHECK_KIND, CONNECTIVITY_CHECK_PLURAL,
    CONNECTIVITY_CHECK_VERSION,
};
use crate::cluster::ports::{
    EventLister, LogBuffer, LogRequest, LogStreamer, OperatorLister, PodLister, PodPage,
    ProbeLister,
};

// * The cluster gateway used by the binary.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    // * Uses the in-cluster service account or the local kubeconfig.
    pub async fn try_default() -> Result<Self, GatherError> {
        let client = Client::try_default().await?;
        Ok(Self::new(client))
    }

    fn cluster_operator_resource() -> ApiResource {
        let gvk = GroupVersionKind::gvk(
            CLUSTER_OPERATOR_GROUP,
            CLUSTER_OPERATOR_VERSION,
            CLUSTER_OPERATOR_KIND,
        );
        ApiResource::from_gvk_with_plural(&gvk, CLUSTER_OPERATOR_PLURAL)
    }

    fn connectivity_check_resource() -> ApiResource {
        let gvk = GroupVersionKind::gvk(
            CONNECTIVITY_CHECK_GROUP,
            CONNECTIVITY_CHECK_VERSION,
            CONNECTIVITY_CHECK_KIND,
        );
        ApiResource::from_gvk_with_plural(&gvk, CONNECTIVITY_CHECK_PLURAL)
    }

    async fn list_dynamic(&self, resource: &ApiResource) -> Result<Vec<DynamicObject>, GatherError> {
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), resource);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl OperatorLister for KubeCluster {
    async fn list_cluster_operators(&self) -> Result<Vec<ClusterOperator>, GatherError> {
        self.list_dynamic(&Self::cluster_operator_resource())
            .await?
            .into_iter()
            .map(from_dynamic)
            .collect()
    }
}

#[async_trait]
impl PodLister for KubeCluster {
    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, GatherError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_pods_page(
        &self,
        limit: u32,
        continue_token: Option<&str>,
    ) -> Result<PodPage, GatherError> {
        let api: Api<Pod> = Api::all(self.client.clone());
        let mut params = ListParams::default().limit(limit);
        if let Some(token) = continue_token {
            params = params.continue_token(token);
        }

        let list = api.list(&params).await?;
        let continue_token = list.metadata.continue_.filter(|token| !token.is_empty());
        debug!(
            count = list.items.len(),
            has_more = continue_token.is_some(),
            "Listed pod page"
        );

        Ok(PodPage {
            items: list.items,
            continue_token,
        })
    }
}

#[async_trait]
impl EventLister for KubeCluster {
    async fn list_events(&self, namespace: &str) -> Result<Vec<Event>, GatherError> {
        let api: Api<Event> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl LogStreamer for KubeCluster {
    async fn stream_logs(
        &self,
        namespace: &str,
        pod: &str,
        request: &LogRequest,
        buf: &mut LogBuffer,
    ) -> Result<(), GatherError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(request.container.clone()),
            previous: request.previous,
            tail_lines: Some(request.tail_lines),
            limit_bytes: Some(request.limit_bytes),
            timestamps: request.timestamps,
            ..LogParams::default()
        };

        let stream = api.log_stream(pod, &params).await?;
        buf.fill_from(Box::pin(stream)).await?;
        Ok(())
    }
}

#[async_trait]
impl ProbeLister for KubeCluster {
    async fn list_connectivity_checks(
        &self,
    ) -> Result<Vec<PodNetworkConnectivityCheck>, GatherError> {
        self.list_dynamic(&Self::connectivity_check_resource())
            .await?
            .into_iter()
            .map(from_dynamic)
            .collect()
    }
}
