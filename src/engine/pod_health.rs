// * Health predicates for pods, containers and cluster operators.

use chrono::{DateTime, TimeDelta, Utc};
use k8s_openapi::api::core::v1::{ContainerState, ContainerStatus, Pod};

use crate::cluster::models::{
    ClusterOperator, CONDITION_AVAILABLE, CONDITION_DEGRADED, CONDITION_FALSE, CONDITION_TRUE,
};
use crate::cluster::timestamps::to_utc;
use crate::config::constants::PENDING_GRACE;

const PHASE_PENDING: &str = "Pending";
const CRASH_LOOP_BACK_OFF: &str = "CrashLoopBackOff";
const NAMESPACE_RESOURCE: &str = "namespaces";

fn init_statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|status| status.init_container_statuses.as_deref())
        .unwrap_or_default()
}

fn main_statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_deref())
        .unwrap_or_default()
}

/// Init statuses followed by main statuses
fn all_statuses(pod: &Pod) -> impl Iterator<Item = &ContainerStatus> {
    init_statuses(pod).iter().chain(main_statuses(pod))
}

fn terminated_with_failure(state: Option<&ContainerState>) -> bool {
    state
        .and_then(|state| state.terminated.as_ref())
        .is_some_and(|terminated| terminated.exit_code != 0)
}

fn waiting_reason(state: Option<&ContainerState>) -> Option<&str> {
    state
        .and_then(|state| state.waiting.as_ref())
        .and_then(|waiting| waiting.reason.as_deref())
}

fn is_container_failing(status: &ContainerStatus) -> bool {
    terminated_with_failure(status.last_state.as_ref())
        || terminated_with_failure(status.state.as_ref())
        || status.restart_count > 0
}

fn is_stuck_pending(pod: &Pod, now: DateTime<Utc>) -> bool {
    let pending = pod
        .status
        .as_ref()
        .and_then(|status| status.phase.as_deref())
        == Some(PHASE_PENDING);
    if !pending {
        return false;
    }
    // * A pending pod with no creation time has been pending since forever
    let created = pod
        .metadata
        .creation_timestamp
        .as_ref()
        .and_then(to_utc)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let grace = TimeDelta::from_std(PENDING_GRACE).unwrap_or_default();
    now.signed_duration_since(created) > grace
}

/// A pod is healthy unless it is stuck pending or any container failed or restarted
pub fn is_healthy_pod(pod: &Pod, now: DateTime<Utc>) -> bool {
    if is_stuck_pending(pod, now) {
        return false;
    }
    !all_statuses(pod).any(is_container_failing)
}

/// True when any init or main container has restarted at least once
pub fn is_pod_restarted(pod: &Pod) -> bool {
    all_statuses(pod).any(|status| status.restart_count > 0)
}

/// Restarted, and either last exited non-zero or is backing off
pub fn is_container_in_crashloop(status: &ContainerStatus) -> bool {
    if status.restart_count <= 0 {
        return false;
    }
    terminated_with_failure(status.last_state.as_ref())
        || waiting_reason(status.state.as_ref()) == Some(CRASH_LOOP_BACK_OFF)
        || waiting_reason(status.last_state.as_ref()) == Some(CRASH_LOOP_BACK_OFF)
}

pub fn has_container_in_crashloop(pod: &Pod) -> bool {
    all_statuses(pod).any(is_container_in_crashloop)
}

/// Number of init plus main containers declared in the pod spec
pub fn total_containers(pod: &Pod) -> usize {
    pod.spec.as_ref().map_or(0, |spec| {
        spec.containers.len() + spec.init_containers.as_ref().map_or(0, Vec::len)
    })
}

/// Container names in harvest order: init containers first
pub fn container_names(pod: &Pod) -> Vec<String> {
    let Some(spec) = pod.spec.as_ref() else {
        return Vec::new();
    };
    spec.init_containers
        .iter()
        .flatten()
        .chain(spec.containers.iter())
        .map(|container| container.name.clone())
        .collect()
}

fn has_condition(operator: &ClusterOperator, type_: &str, status: &str) -> bool {
    operator
        .status
        .conditions
        .iter()
        .any(|condition| condition.type_ == type_ && condition.status == status)
}

pub fn is_operator_degraded(operator: &ClusterOperator) -> bool {
    has_condition(operator, CONDITION_DEGRADED, CONDITION_TRUE)
}

pub fn is_operator_unavailable(operator: &ClusterOperator) -> bool {
    has_condition(operator, CONDITION_AVAILABLE, CONDITION_FALSE)
}

/// Degraded=True or Available=False
pub fn is_operator_unhealthy(operator: &ClusterOperator) -> bool {
    is_operator_degraded(operator) || is_operator_unavailable(operator)
}

/// Names of the operator's related namespaces, in order, duplicates kept
pub fn namespaces_for_operator(operator: &ClusterOperator) -> Vec<String> {
    operator
        .status
        .related_objects
        .iter()
        .filter(|object| object.resource == NAMESPACE_RESOURCE)
        .map(|object| object.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::models::{OperatorCondition, RelatedObject};
    use crate::cluster::timestamps::from_utc;
    use k8s_openapi::api::core::v1::{
        Container, ContainerStateTerminated, ContainerStateWaiting, PodSpec, PodStatus,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn status(restarts: i32) -> ContainerStatus {
        ContainerStatus {
            name: "app".to_string(),
            restart_count: restarts,
            ..Default::default()
        }
    }

    fn terminated(exit_code: i32) -> Option<ContainerState> {
        Some(ContainerState {
            terminated: Some(ContainerStateTerminated {
                exit_code,
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn waiting(reason: &str) -> Option<ContainerState> {
        Some(ContainerState {
            waiting: Some(ContainerStateWaiting {
                reason: Some(reason.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
    }

    fn pod_with(phase: &str, created: DateTime<Utc>, statuses: Vec<ContainerStatus>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                creation_timestamp: from_utc(created),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_string()),
                container_statuses: Some(statuses),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_running_pod_is_healthy() {
        let now = Utc::now();
        assert!(is_healthy_pod(&pod_with("Running", now, vec![status(0)]), now));
    }

    #[test]
    fn test_pending_grace_period() {
        let now = Utc::now();
        let fresh = pod_with("Pending", now - TimeDelta::seconds(90), vec![]);
        let stuck = pod_with("Pending", now - TimeDelta::minutes(3), vec![]);
        assert!(is_healthy_pod(&fresh, now));
        assert!(!is_healthy_pod(&stuck, now));
    }

    #[test]
    fn test_failed_exit_or_restart_is_unhealthy() {
        let now = Utc::now();
        let mut exited = status(0);
        exited.state = terminated(1);
        assert!(!is_healthy_pod(&pod_with("Running", now, vec![exited]), now));

        let mut clean_exit = status(0);
        clean_exit.state = terminated(0);
        assert!(is_healthy_pod(&pod_with("Succeeded", now, vec![clean_exit]), now));

        let restarted = pod_with("Running", now, vec![status(2)]);
        assert!(!is_healthy_pod(&restarted, now));
        assert!(is_pod_restarted(&restarted));
    }

    #[test]
    fn test_init_container_restart_counts() {
        let now = Utc::now();
        let mut pod = pod_with("Running", now, vec![status(0)]);
        if let Some(pod_status) = pod.status.as_mut() {
            pod_status.init_container_statuses = Some(vec![status(1)]);
        }
        assert!(is_pod_restarted(&pod));
        assert!(!is_healthy_pod(&pod, now));
    }

    #[test]
    fn test_crashloop_definition() {
        let mut backing_off = status(3);
        backing_off.state = waiting(CRASH_LOOP_BACK_OFF);
        assert!(is_container_in_crashloop(&backing_off));

        let mut failed_last = status(1);
        failed_last.last_state = terminated(137);
        assert!(is_container_in_crashloop(&failed_last));

        let mut never_restarted = status(0);
        never_restarted.state = waiting(CRASH_LOOP_BACK_OFF);
        assert!(!is_container_in_crashloop(&never_restarted));

        let mut restarted_cleanly = status(1);
        restarted_cleanly.last_state = terminated(0);
        assert!(!is_container_in_crashloop(&restarted_cleanly));
    }

    #[test]
    fn test_operator_health() {
        let mut operator = ClusterOperator::default();
        operator.status.conditions = vec![
            OperatorCondition::new(CONDITION_AVAILABLE, CONDITION_TRUE),
            OperatorCondition::new(CONDITION_DEGRADED, CONDITION_FALSE),
        ];
        assert!(!is_operator_unhealthy(&operator));

        operator.status.conditions[0].status = CONDITION_FALSE.to_string();
        assert!(is_operator_unhealthy(&operator));

        operator.status.conditions[0].status = CONDITION_TRUE.to_string();
        operator.status.conditions[1].status = CONDITION_TRUE.to_string();
        assert!(is_operator_unhealthy(&operator));
    }

    #[test]
    fn test_namespaces_for_operator() {
        let mut operator = ClusterOperator::default();
        operator.status.related_objects = vec![
            RelatedObject::namespace("openshift-etcd"),
            RelatedObject {
                group: "apps".to_string(),
                resource: "deployments".to_string(),
                namespace: Some("openshift-etcd".to_string()),
                name: "etcd-operator".to_string(),
            },
            RelatedObject::namespace("openshift-etcd"),
        ];
        assert_eq!(
            namespaces_for_operator(&operator),
            vec!["openshift-etcd", "openshift-etcd"]
        );
    }

    #[test]
    fn test_container_order() {
        let pod = Pod {
            spec: Some(PodSpec {
                init_containers: Some(vec![Container {
                    name: "setup".to_string(),
                    ..Default::default()
                }]),
                containers: vec![
                    Container {
                        name: "main".to_string(),
                        ..Default::default()
                    },
                    Container {
                        name: "sidecar".to_string(),
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(container_names(&pod), vec!["setup", "main", "sidecar"]);
        assert_eq!(total_containers(&pod), 3);
    }
}
