// * Log harvester
// * fetch short tail -> detect stack trace -> refetch long tail -> compress stack region
// * One `LogBuffer` is reused for every fetch so memory stays bounded by the budget.

use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Pod;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::cluster::context::GatherContext;
use crate::cluster::errors::GatherError;
use crate::cluster::ports::{LogBuffer, LogRequest, LogStreamer};
use crate::config::constants::{
    LOG_TAIL_LONG, LOG_TAIL_SHORT, STACK_BEGIN, STACK_END, STACK_MAX, STACK_OFFSET,
};
use crate::engine::pod_health::{container_names, is_healthy_pod, is_pod_restarted};
use crate::ops::telemetry;
use crate::record::{anonymize_pod, Record};

// * Go panic frames, e.g. `main.go:42 +0x1d`
static STACK_TRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.go:\d+\s\+0x").expect("Invalid stack trace regex"));

pub fn contains_stack_trace(log: &str) -> bool {
    STACK_TRACE.is_match(log)
}

/// Keeps the log from shortly before the first stack-trace line and,
/// for long traces, cuts out the middle of the stack region.
///
/// Logs without a stack-trace line are returned unchanged.
pub fn compress_stack_trace(log: &str) -> String {
    let lines: Vec<&str> = log.split('\n').collect();
    let Some(start) = lines.iter().position(|line| STACK_TRACE.is_match(line)) else {
        return log.to_string();
    };
    let end = lines
        .iter()
        .rposition(|line| STACK_TRACE.is_match(line))
        .unwrap_or(start)
        .max(start);

    // * Inclusive count of lines in the stack region
    let stack_len = end - start + 1;
    let from = start.saturating_sub(STACK_OFFSET);

    if stack_len <= STACK_MAX {
        return lines[from..].join("\n");
    }

    let to = (from + STACK_BEGIN).min(lines.len());
    let mut compressed = lines[from..to].join("\n");
    compressed.push_str(&format!(
        "\n... ({} stacktrace lines suppressed) ...\n",
        stack_len - STACK_MAX
    ));
    compressed.push_str(&lines[end.saturating_sub(STACK_END)..].join("\n"));
    compressed
}

/// `{container}_current.log` or `{container}_previous.log`
pub fn log_filename(container: &str, previous: bool) -> String {
    let phase = if previous { "previous" } else { "current" };
    format!("{container}_{phase}.log")
}

pub fn log_record_name(namespace: &str, pod: &str, container: &str, previous: bool) -> String {
    format!(
        "config/pod/{namespace}/{pod}/logs/{pod}/{}",
        log_filename(container, previous)
    )
}

pub fn pod_record_name(namespace: &str, pod: &str) -> String {
    format!("config/pod/{namespace}/{pod}")
}

fn pod_identity(pod: &Pod) -> (&str, &str) {
    (
        pod.metadata.namespace.as_deref().unwrap_or_default(),
        pod.metadata.name.as_deref().unwrap_or_default(),
    )
}

/// Collects pod definitions and container logs under a per-fetch byte budget.
pub struct LogHarvester<'a> {
    streamer: &'a dyn LogStreamer,
    buf: LogBuffer,
}

impl<'a> LogHarvester<'a> {
    /// `budget` is the byte cap of each single fetch
    pub fn new(streamer: &'a dyn LogStreamer, budget: usize) -> Self {
        Self {
            streamer,
            buf: LogBuffer::with_capacity(budget),
        }
    }

    pub fn budget(&self) -> usize {
        self.buf.capacity()
    }

    /// Harvests every pod in order.
    ///
    /// Per pod: the anonymized definition and previous logs when the pod is
    /// unhealthy, then current logs. Only cancellation stops the walk; the
    /// records gathered before it are returned alongside the error.
    pub async fn harvest(
        &mut self,
        ctx: &GatherContext,
        pods: &[Pod],
        now: DateTime<Utc>,
    ) -> (Vec<Record>, Option<GatherError>) {
        let mut records = Vec::new();
        for pod in pods {
            if let Err(e) = self.harvest_pod(ctx, pod, now, &mut records).await {
                return (records, Some(e));
            }
        }
        (records, None)
    }

    async fn harvest_pod(
        &mut self,
        ctx: &GatherContext,
        pod: &Pod,
        now: DateTime<Utc>,
        records: &mut Vec<Record>,
    ) -> Result<(), GatherError> {
        let (namespace, name) = pod_identity(pod);

        if !is_healthy_pod(pod, now) {
            let mut definition = pod.clone();
            anonymize_pod(&mut definition);
            records.push(Record::json(pod_record_name(namespace, name), &definition)?);

            if is_pod_restarted(pod) {
                self.harvest_containers(ctx, pod, true, records).await?;
            }
        }
        self.harvest_containers(ctx, pod, false, records).await
    }

    async fn harvest_containers(
        &mut self,
        ctx: &GatherContext,
        pod: &Pod,
        previous: bool,
        records: &mut Vec<Record>,
    ) -> Result<(), GatherError> {
        let (namespace, name) = pod_identity(pod);

        for container in container_names(pod) {
            match self.container_log(ctx, namespace, name, &container, previous).await {
                Ok(log) => {
                    telemetry::record_log_bytes(log.len());
                    records.push(Record::raw(
                        log_record_name(namespace, name, &container, previous),
                        log,
                    ));
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    debug!(
                        namespace = namespace,
                        pod = name,
                        container = %container,
                        previous = previous,
                        error = %e,
                        "Skipping container log"
                    );
                }
            }
        }
        Ok(())
    }

    /// Fetches one container log, re-fetching a longer tail when it holds a stack trace
    pub async fn container_log(
        &mut self,
        ctx: &GatherContext,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
    ) -> Result<String, GatherError> {
        let log = self
            .fetch(ctx, namespace, pod, container, previous, LOG_TAIL_SHORT)
            .await?;
        if !contains_stack_trace(&log) {
            return Ok(log);
        }

        debug!(
            namespace = namespace,
            pod = pod,
            container = container,
            previous = previous,
            "Stack trace found in log"
        );
        let long = self
            .fetch(ctx, namespace, pod, container, previous, LOG_TAIL_LONG)
            .await?;
        Ok(compress_stack_trace(&long))
    }

    async fn fetch(
        &mut self,
        ctx: &GatherContext,
        namespace: &str,
        pod: &str,
        container: &str,
        previous: bool,
        tail_lines: i64,
    ) -> Result<String, GatherError> {
        self.buf.reset();
        let request = LogRequest {
            container: container.to_string(),
            previous,
            tail_lines,
            limit_bytes: i64::try_from(self.buf.capacity()).unwrap_or(i64::MAX),
            timestamps: true,
        };
        ctx.guard(
            self.streamer
                .stream_logs(namespace, pod, &request, &mut self.buf),
        )
        .await?;

        if self.buf.is_empty() {
            return Err(GatherError::EmptyLog);
        }
        Ok(self.buf.to_string_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(total: usize, stack: std::ops::RangeInclusive<usize>) -> Vec<String> {
        (0..total)
            .map(|i| {
                if stack.contains(&i) {
                    format!("goroutine frame /src/main.go:{i} +0x1f")
                } else {
                    format!("line {i}")
                }
            })
            .collect()
    }

    #[test]
    fn test_regex() {
        assert!(contains_stack_trace("\t/go/src/pkg/server.go:123 +0x45"));
        assert!(!contains_stack_trace("server.go:123 started"));
    }

    #[test]
    fn test_no_stack_trace_is_unchanged() {
        assert_eq!(compress_stack_trace("a\nb\nc\n"), "a\nb\nc\n");
    }

    #[test]
    fn test_short_region_keeps_offset_window() {
        let lines = numbered(60, 30..=35);
        let compressed = compress_stack_trace(&lines.join("\n"));
        assert_eq!(compressed, lines[10..].join("\n"));
    }

    #[test]
    fn test_stack_near_start_clamps_offset() {
        let lines = numbered(10, 2..=3);
        let compressed = compress_stack_trace(&lines.join("\n"));
        assert_eq!(compressed, lines.join("\n"));
    }

    #[test]
    fn test_boundary_at_stack_max_is_not_suppressed() {
        let lines = numbered(100, 20..=59);
        let compressed = compress_stack_trace(&lines.join("\n"));
        assert!(!compressed.contains("suppressed"));

        let lines = numbered(100, 20..=60);
        let compressed = compress_stack_trace(&lines.join("\n"));
        assert!(compressed.contains("(1 stacktrace lines suppressed)"));
    }

    #[test]
    fn test_trailing_newline_is_preserved() {
        let mut log = numbered(5, 1..=1).join("\n");
        log.push('\n');
        assert!(compress_stack_trace(&log).ends_with("line 4\n"));
    }

    #[test]
    fn test_names() {
        assert_eq!(log_filename("etcd", false), "etcd_current.log");
        assert_eq!(
            log_record_name("openshift-etcd", "etcd-0", "etcd", true),
            "config/pod/openshift-etcd/etcd-0/logs/etcd-0/etcd_previous.log"
        );
        assert_eq!(pod_record_name("ns", "p"), "config/pod/ns/p");
    }
}
