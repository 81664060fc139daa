use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;

use cluster_insights::ops::telemetry;
use cluster_insights::{ClusterGatherer, GatherConfig, GatherContext, KubeCluster};

// * Optional path to a JSON `GatherConfig` document
const CONFIG_ENV: &str = "CLUSTER_INSIGHTS_CONFIG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
    let config = GatherConfig::load_optional(config_path.as_deref())
        .with_context(|| format!("loading gather config from {CONFIG_ENV}"))?;
    tracing::info!(
        interval_secs = config.interval.as_secs(),
        max_archive_bytes = config.max_archive_bytes,
        "Cluster Insights gather starting"
    );

    let cluster = KubeCluster::try_default()
        .await
        .context("connecting to the cluster API")?;
    let gatherer = ClusterGatherer::new(Arc::new(cluster), config);

    // * Ctrl-C cancels the in-flight API calls; collected records are still reported
    let ctx = GatherContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling gather");
            canceller.cancel();
        }
    });

    let outcome = gatherer.gather_all(&ctx).await;

    for record in &outcome.records {
        let bytes = record.marshal().map(|bytes| bytes.len()).unwrap_or_default();
        tracing::info!(record = %record.file_name(), bytes = bytes, "Gathered record");
    }
    for message in outcome.error_messages() {
        tracing::warn!(error = %message, "Gather error");
    }
    tracing::info!(
        records = outcome.records.len(),
        errors = outcome.errors.len(),
        cancelled = outcome.was_cancelled(),
        "Cluster Insights gather finished"
    );
    tracing::debug!(metrics = %telemetry::get_metrics_string(), "Gather metrics");

    Ok(())
}
