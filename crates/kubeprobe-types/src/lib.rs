//! Shared types for kubeprobe
//!
//! This crate contains the summary records produced from Kubernetes objects,
//! the set of resource kinds that can be fetched as documents, and the
//! byte/quantity formatting helpers.

pub mod format;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use format::{format_bytes, parse_cpu, parse_memory};

// ============================================================================
// Resource references
// ============================================================================

/// Resource kinds that can be fetched as a full document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Pod,
    Deployment,
    Service,
    ConfigMap,
    Secret,
    Job,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 6] = [
        Self::Pod,
        Self::Deployment,
        Self::Service,
        Self::ConfigMap,
        Self::Secret,
        Self::Job,
    ];

    /// Name used on the wire ("pod", "configmap", ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pod => "pod",
            Self::Deployment => "deployment",
            Self::Service => "service",
            Self::ConfigMap => "configmap",
            Self::Secret => "secret",
            Self::Job => "job",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a resource kind string is not one of [`ResourceKind::ALL`]
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported resource type: {0}")]
pub struct UnsupportedResourceKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnsupportedResourceKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnsupportedResourceKind(s.to_string()))
    }
}

/// Identifies a single namespaced object for document retrieval
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRef {
    pub namespace: String,
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceRef {
    /// Validate `kind` and build a reference; fails without touching the cluster
    pub fn parse(namespace: &str, kind: &str, name: &str) -> Result<Self, UnsupportedResourceKind> {
        Ok(Self {
            namespace: namespace.to_string(),
            kind: kind.parse()?,
            name: name.to_string(),
        })
    }
}

/// Encoding used for list responses
///
/// Parsed case-insensitively, with "yml" accepted for YAML, from both the
/// command line and the config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Json,
    Yaml,
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!("unknown encoding '{}', expected json or yaml", other)),
        }
    }
}

impl<'de> Deserialize<'de> for Encoding {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Core summaries
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NamespaceSummary {
    pub name: String,
    pub phase: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PodSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub phase: Option<String>,
    pub pod_ip: Option<String>,
    pub node_name: Option<String>,
    pub created_at: Option<String>,
    pub containers: Vec<ContainerSummary>,
}

/// A container from the pod spec joined with its runtime status
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainerSummary {
    pub name: String,
    pub image: Option<String>,
    /// True iff a status with the same name carries a container id
    pub ready: bool,
    pub container_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    /// Condition type to status; the last entry of a repeated type wins
    pub conditions: BTreeMap<String, String>,
    /// Address type to address; the last entry of a repeated type wins
    pub addresses: BTreeMap<String, String>,
    pub capacity: BTreeMap<String, String>,
    pub allocatable: BTreeMap<String, String>,
    pub kubelet_version: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FailedPodSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub phase: Option<String>,
    pub node_name: Option<String>,
    pub message: Option<String>,
    pub reason: Option<String>,
    pub container_statuses: Vec<ContainerStatusSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ContainerStatusSummary {
    pub name: String,
    pub restart_count: i32,
    #[serde(serialize_with = "state_or_empty")]
    pub state: Option<ContainerStateSummary>,
}

/// The non-running state of a container; waiting takes precedence over terminated
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ContainerStateSummary {
    Waiting {
        reason: Option<String>,
        message: Option<String>,
    },
    Terminated {
        reason: Option<String>,
        message: Option<String>,
        exit_code: i32,
    },
}

/// A missing state serializes as an empty mapping rather than null
fn state_or_empty<S: Serializer>(
    state: &Option<ContainerStateSummary>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match state {
        Some(state) => state.serialize(serializer),
        None => serializer.serialize_map(Some(0))?.end(),
    }
}

// ============================================================================
// Workload and service summaries
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DeploymentSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub replicas: Option<i32>,
    pub available_replicas: Option<i32>,
    pub ready_replicas: Option<i32>,
    pub strategy: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub name: String,
    pub namespace: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub external_ips: Vec<String>,
    pub ports: Vec<ServicePortSummary>,
    pub selector: BTreeMap<String, String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServicePortSummary {
    pub name: Option<String>,
    pub port: i32,
    /// Either a port number or a named container port
    pub target_port: Option<serde_json::Value>,
    pub protocol: Option<String>,
    pub node_port: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EventSummary {
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub reason: Option<String>,
    pub message: Option<String>,
    /// "<Kind>/<name>" of the involved object
    pub object: String,
    pub namespace: Option<String>,
    pub count: Option<i32>,
    pub first_time: Option<String>,
    pub last_time: Option<String>,
}

// ============================================================================
// Troubleshooting reports
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PendingPodSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub node_name: Option<String>,
    /// Reason of the most recent event as reported, or "Unknown" when there are none
    pub reason: Option<String>,
    pub message: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HighRestartPodSummary {
    pub name: String,
    pub namespace: Option<String>,
    pub node_name: Option<String>,
    pub containers: Vec<RestartingContainer>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RestartingContainer {
    pub name: String,
    pub restart_count: i32,
    pub ready: bool,
    pub image: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeCapacitySummary {
    pub name: String,
    pub pods: PodUsage,
    pub cpu: CpuUsage,
    pub memory: MemoryUsage,
    pub conditions: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PodUsage {
    pub used: u64,
    pub capacity: u64,
    pub percent_used: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CpuUsage {
    /// Cores requested by scheduled pods
    pub requested: f64,
    pub allocatable: f64,
    pub percent_used: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemoryUsage {
    pub requested: u64,
    pub requested_human: String,
    pub allocatable: u64,
    pub allocatable_human: String,
    pub percent_used: f64,
}

/// Objects without owner references, grouped by kind
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct OrphanedResources {
    pub pods: Vec<OrphanSummary>,
    pub services: Vec<OrphanSummary>,
    pub persistent_volume_claims: Vec<OrphanSummary>,
    pub config_maps: Vec<OrphanSummary>,
    pub secrets: Vec<OrphanSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OrphanSummary {
    pub name: String,
    pub namespace: Option<String>,
    /// Only set for secrets
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub secret_type: Option<String>,
    pub created_at: Option<String>,
}
