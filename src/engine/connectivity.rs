// * Connectivity-check aggregator
// * Folds recent failed probe entries into reason -> message -> latest start.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use crate::cluster::context::GatherContext;
use crate::cluster::models::{PodNetworkConnectivityCheck, ProbeLogEntry};
use crate::cluster::ports::ProbeLister;
use crate::cluster::timestamps::window_start;
use crate::config::constants::PROBE_WINDOW;
use crate::record::{GatherOutcome, Record};

pub const CONNECTIVITY_CHECKS_RECORD: &str = "config/podnetworkconnectivitychecks";

/// reason -> message -> most recent start
pub type UnsuccessfulProbes = BTreeMap<String, BTreeMap<String, DateTime<Utc>>>;

/// Every log entry of a check: failures, then outage start logs, then outage end logs
fn probe_entries(check: &PodNetworkConnectivityCheck) -> impl Iterator<Item = &ProbeLogEntry> {
    let status = &check.status;
    status
        .failures
        .iter()
        .chain(status.outages.iter().flat_map(|outage| outage.start_logs.iter()))
        .chain(status.outages.iter().flat_map(|outage| outage.end_logs.iter()))
}

/// Upserts `entry` keeping the latest start per (reason, message)
pub fn fold_entry(probes: &mut UnsuccessfulProbes, entry: &ProbeLogEntry, start: DateTime<Utc>) {
    probes
        .entry(entry.reason.clone())
        .or_default()
        .entry(entry.message.clone())
        .and_modify(|latest| *latest = (*latest).max(start))
        .or_insert(start);
}

/// Aggregates unsuccessful entries that started within `window` before `now`.
///
/// Entries without a start time are skipped.
pub fn aggregate_unsuccessful(
    checks: &[PodNetworkConnectivityCheck],
    window: Duration,
    now: DateTime<Utc>,
) -> UnsuccessfulProbes {
    let oldest = window_start(now, window);
    let mut probes = UnsuccessfulProbes::new();
    for (entry, start) in checks
        .iter()
        .flat_map(probe_entries)
        .filter(|entry| !entry.success)
        .filter_map(|entry| entry.start.map(|start| (entry, start)))
        .filter(|(_, start)| *start >= oldest)
    {
        fold_entry(&mut probes, entry, start);
    }
    probes
}

/// Lists every connectivity check and records the aggregated failures.
///
/// A missing resource type yields an empty map, which is still recorded.
pub async fn gather_pod_network_connectivity_checks(
    ctx: &GatherContext,
    probes: &dyn ProbeLister,
) -> GatherOutcome {
    let checks = match ctx.guard(probes.list_connectivity_checks()).await {
        Ok(checks) => checks,
        Err(e) if e.is_not_found() => {
            debug!("Connectivity checks are not available");
            Vec::new()
        }
        Err(e) => return GatherOutcome::with_error(Vec::new(), e),
    };

    let aggregated = aggregate_unsuccessful(&checks, PROBE_WINDOW, Utc::now());
    debug!(checks = checks.len(), reasons = aggregated.len(), "Aggregated connectivity checks");
    match Record::json(CONNECTIVITY_CHECKS_RECORD, &aggregated) {
        Ok(record) => GatherOutcome::from_records(vec![record]),
        Err(e) => GatherOutcome::with_error(Vec::new(), e),
    }
}
