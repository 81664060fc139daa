// * Unhealthy-operator walk
// * operators -> unhealthy ones -> related namespaces -> pods + events -> budgeted log harvest

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use crate::cluster::context::GatherContext;
use crate::cluster::errors::GatherError;
use crate::cluster::models::ClusterOperator;
use crate::cluster::ports::{EventLister, LogStreamer, OperatorLister, PodLister};
use crate::config::GatherConfig;
use crate::engine::events::{gather_namespace_events, EventFilter};
use crate::engine::logs::LogHarvester;
use crate::engine::pod_health::{is_operator_unhealthy, namespaces_for_operator, total_containers};
use crate::record::{GatherOutcome, Record};

/// Pods selected for log collection plus the records gathered on the way
#[derive(Debug, Default)]
pub struct HarvestSet {
    pub pods: Vec<Pod>,
    pub total_containers: usize,
    pub records: Vec<Record>,
    /// Set when the walk was cut short by cancellation
    pub interrupted: Option<GatherError>,
}

/// Walks the namespaces of unhealthy operators, collecting their pods and events.
///
/// Namespace-scoped list failures are logged and skipped. Cancellation stops
/// the walk and is reported in `interrupted`.
pub async fn collect_unhealthy_operator_pods(
    ctx: &GatherContext,
    operators: &[ClusterOperator],
    pods: &dyn PodLister,
    events: &dyn EventLister,
    interval: Duration,
) -> HarvestSet {
    let mut harvest = HarvestSet::default();
    let mut events_collected: HashSet<String> = HashSet::new();

    for operator in operators.iter().filter(|operator| is_operator_unhealthy(operator)) {
        for namespace in namespaces_for_operator(operator) {
            let namespace_pods = match ctx.guard(pods.list_namespaced_pods(&namespace)).await {
                Ok(listed) => listed,
                Err(e) if e.is_cancelled() => {
                    harvest.interrupted = Some(e);
                    return harvest;
                }
                Err(e) => {
                    debug!(
                        namespace = %namespace,
                        operator = operator.name(),
                        error = %e,
                        "Unable to list pods for failing operator"
                    );
                    continue;
                }
            };
            harvest.total_containers += namespace_pods.iter().map(total_containers).sum::<usize>();
            harvest.pods.extend(namespace_pods);

            if events_collected.contains(&namespace) {
                continue;
            }
            match gather_namespace_events(ctx, events, &namespace, interval, EventFilter::Any).await
            {
                Ok(records) => {
                    harvest.records.extend(records);
                    events_collected.insert(namespace);
                }
                Err(e) if e.is_cancelled() => {
                    harvest.interrupted = Some(e);
                    return harvest;
                }
                Err(e) => {
                    debug!(namespace = %namespace, error = %e, "Unable to collect namespace events");
                }
            }
        }
    }

    harvest
}

/// Gathers pods, events and logs for every degraded or unavailable operator.
pub async fn gather_operator_pods_and_events(
    ctx: &GatherContext,
    operators: &dyn OperatorLister,
    pods: &dyn PodLister,
    events: &dyn EventLister,
    logs: &dyn LogStreamer,
    config: &GatherConfig,
) -> GatherOutcome {
    let listed = match ctx.guard(operators.list_cluster_operators()).await {
        Ok(listed) => listed,
        Err(e) if e.is_not_found() => return GatherOutcome::new(),
        Err(e) => return GatherOutcome::with_error(Vec::new(), e),
    };

    let harvest = collect_unhealthy_operator_pods(ctx, &listed, pods, events, config.interval).await;
    if let Some(e) = harvest.interrupted {
        return GatherOutcome::with_error(harvest.records, e);
    }
    info!(
        pods = harvest.pods.len(),
        containers = harvest.total_containers,
        "Found pods of unhealthy operators"
    );

    let mut outcome = GatherOutcome::from_records(harvest.records);
    if harvest.pods.is_empty() || harvest.total_containers == 0 {
        return outcome;
    }

    let budget = match config.log_budget(harvest.total_containers) {
        Ok(budget) => budget,
        Err(e) => {
            debug!(error = %e, "Unable to gather pod container logs");
            return outcome;
        }
    };
    debug!(budget = budget, "Maximum log buffer size");

    let mut harvester = LogHarvester::new(logs, budget);
    let (records, interrupted) = harvester.harvest(ctx, &harvest.pods, Utc::now()).await;
    outcome.records.extend(records);
    if let Some(e) = interrupted {
        outcome.push_error(e);
    }
    outcome
}
