// * Gather facade
// * Binds the gather tasks to one cluster and one config, and times each task.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::cluster::context::GatherContext;
use crate::cluster::ports::{EventLister, LogStreamer, OperatorLister, PodLister, ProbeLister};
use crate::config::GatherConfig;
use crate::engine::{connectivity, images, operators};
use crate::ops::telemetry;
use crate::record::GatherOutcome;

pub const OPERATOR_PODS_AND_EVENTS: &str = "operators_pods_and_events";
pub const CONTAINER_IMAGES: &str = "container_images";
pub const POD_NETWORK_CONNECTIVITY_CHECKS: &str = "pod_network_connectivity_checks";

/// Runs the diagnostic gather tasks against one cluster.
///
/// Tasks share no mutable state, so `gather_all` runs them concurrently.
#[derive(Clone)]
pub struct ClusterGatherer {
    operators: Arc<dyn OperatorLister>,
    pods: Arc<dyn PodLister>,
    events: Arc<dyn EventLister>,
    logs: Arc<dyn LogStreamer>,
    probes: Arc<dyn ProbeLister>,
    config: GatherConfig,
}

impl ClusterGatherer {
    pub fn new<C>(cluster: Arc<C>, config: GatherConfig) -> Self
    where
        C: OperatorLister + PodLister + EventLister + LogStreamer + ProbeLister + 'static,
    {
        Self {
            operators: cluster.clone(),
            pods: cluster.clone(),
            events: cluster.clone(),
            logs: cluster.clone(),
            probes: cluster,
            config,
        }
    }

    pub fn config(&self) -> &GatherConfig {
        &self.config
    }

    pub async fn gather_operator_pods_and_events(&self, ctx: &GatherContext) -> GatherOutcome {
        timed(
            OPERATOR_PODS_AND_EVENTS,
            operators::gather_operator_pods_and_events(
                ctx,
                self.operators.as_ref(),
                self.pods.as_ref(),
                self.events.as_ref(),
                self.logs.as_ref(),
                &self.config,
            ),
        )
        .await
    }

    pub async fn gather_container_images(&self, ctx: &GatherContext) -> GatherOutcome {
        timed(
            CONTAINER_IMAGES,
            images::gather_container_images(ctx, self.pods.as_ref()),
        )
        .await
    }

    pub async fn gather_pod_network_connectivity_checks(&self, ctx: &GatherContext) -> GatherOutcome {
        timed(
            POD_NETWORK_CONNECTIVITY_CHECKS,
            connectivity::gather_pod_network_connectivity_checks(ctx, self.probes.as_ref()),
        )
        .await
    }

    /// Runs every task concurrently and merges their outcomes in task order
    pub async fn gather_all(&self, ctx: &GatherContext) -> GatherOutcome {
        let (operators, images, checks) = futures::join!(
            self.gather_operator_pods_and_events(ctx),
            self.gather_container_images(ctx),
            self.gather_pod_network_connectivity_checks(ctx),
        );

        let mut outcome = GatherOutcome::new();
        outcome.merge(operators);
        outcome.merge(images);
        outcome.merge(checks);
        outcome
    }
}

async fn timed<F>(gatherer: &str, task: F) -> GatherOutcome
where
    F: Future<Output = GatherOutcome>,
{
    let started = Instant::now();
    let outcome = task.await;
    let elapsed = started.elapsed();
    telemetry::record_gather(gatherer, elapsed, outcome.records.len(), outcome.errors.len());

    if outcome.is_clean() {
        info!(
            gatherer = gatherer,
            records = outcome.records.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Gather task finished"
        );
    } else {
        warn!(
            gatherer = gatherer,
            records = outcome.records.len(),
            errors = ?outcome.error_messages(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Gather task finished with errors"
        );
    }
    outcome
}
