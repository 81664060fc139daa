// * Typed models for the platform resources that have no k8s-openapi type.
// * Only the fields read by the gatherers are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::cluster::errors::GatherError;

pub const CLUSTER_OPERATOR_GROUP: &str = "config.openshift.io";
pub const CLUSTER_OPERATOR_VERSION: &str = "v1";
pub const CLUSTER_OPERATOR_KIND: &str = "ClusterOperator";
pub const CLUSTER_OPERATOR_PLURAL: &str = "clusteroperators";

pub const CONNECTIVITY_CHECK_GROUP: &str = "controlplane.operator.openshift.io";
pub const CONNECTIVITY_CHECK_VERSION: &str = "v1alpha1";
pub const CONNECTIVITY_CHECK_KIND: &str = "PodNetworkConnectivityCheck";
pub const CONNECTIVITY_CHECK_PLURAL: &str = "podnetworkconnectivitychecks";

pub const CONDITION_DEGRADED: &str = "Degraded";
pub const CONDITION_AVAILABLE: &str = "Available";
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";

/// A control-plane component and its reported health
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterOperator {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ClusterOperatorStatus,
}

impl ClusterOperator {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperatorStatus {
    #[serde(default)]
    pub conditions: Vec<OperatorCondition>,
    #[serde(default)]
    pub related_objects: Vec<RelatedObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl OperatorCondition {
    pub fn new(type_: &str, status: &str) -> Self {
        Self {
            type_: type_.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelatedObject {
    #[serde(default)]
    pub group: String,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl RelatedObject {
    pub fn namespace(name: &str) -> Self {
        Self {
            resource: "namespaces".to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// An in-cluster reachability probe and its outcome log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PodNetworkConnectivityCheck {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ConnectivityCheckStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityCheckStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub successes: Vec<ProbeLogEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub failures: Vec<ProbeLogEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outages: Vec<ProbeOutage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeLogEntry {
    #[serde(rename = "time", default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_logs: Vec<ProbeLogEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_logs: Vec<ProbeLogEntry>,
}

// * Nullable API lists arrive as `null`; read them as empty
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Re-reads an untyped API object as one of the typed models above
pub fn from_dynamic<T: DeserializeOwned>(object: DynamicObject) -> Result<T, GatherError> {
    let value = serde_json::to_value(object)?;
    Ok(serde_json::from_value(value)?)
}
