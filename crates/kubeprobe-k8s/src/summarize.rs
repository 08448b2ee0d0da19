//! Conversion of raw Kubernetes objects into summary records
//!
//! Every function here is a pure transformation. Fields that are absent on
//! the source object stay absent (`None`, or an empty map/list) in the summary.

use std::collections::{BTreeMap, HashMap};

use chrono::SecondsFormat;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, ContainerStatus, Event, Namespace, Node, PersistentVolumeClaim, Pod, Secret,
    Service,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use kubeprobe_types::format::{percent, round2};
use kubeprobe_types::{
    ContainerStateSummary, ContainerStatusSummary, ContainerSummary, CpuUsage, DeploymentSummary,
    EventSummary, FailedPodSummary, HighRestartPodSummary, MemoryUsage, NamespaceSummary,
    NodeCapacitySummary, NodeSummary, OrphanSummary, OrphanedResources, PendingPodSummary,
    PodSummary, PodUsage, RestartingContainer, ServicePortSummary, ServiceSummary, format_bytes,
    parse_cpu, parse_memory,
};

/// Restart count above which a container is reported by [`high_restart_summary`]
pub const DEFAULT_RESTART_THRESHOLD: i32 = 5;

/// Reason reported for a pending pod that has no events
const UNKNOWN_PENDING_REASON: &str = "Unknown";

/// Name prefix and namespace of system objects skipped by the orphan report
const SYSTEM_PREFIX: &str = "kube-";
const SYSTEM_NAMESPACE: &str = "kube-system";

fn timestamp(time: Option<&Time>) -> Option<String> {
    time.map(|t| t.0.to_rfc3339_opts(SecondsFormat::Secs, true))
}

fn created_at(metadata: &ObjectMeta) -> Option<String> {
    timestamp(metadata.creation_timestamp.as_ref())
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> BTreeMap<String, String> {
    map.map(|m| m.iter().map(|(k, v)| (k.clone(), v.0.clone())).collect())
        .unwrap_or_default()
}

fn phase(pod: &Pod) -> Option<&str> {
    pod.status.as_ref().and_then(|s| s.phase.as_deref())
}

fn container_statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default()
}

pub fn is_failed(pod: &Pod) -> bool {
    phase(pod) == Some("Failed")
}

pub fn is_pending(pod: &Pod) -> bool {
    phase(pod) == Some("Pending")
}

// ============================================================================
// Core summaries
// ============================================================================

pub fn namespace_summary(ns: Namespace) -> NamespaceSummary {
    NamespaceSummary {
        created_at: created_at(&ns.metadata),
        name: ns.metadata.name.unwrap_or_default(),
        phase: ns.status.and_then(|s| s.phase),
    }
}

pub fn pod_summary(pod: Pod) -> PodSummary {
    let statuses = container_statuses(&pod);

    let containers = pod
        .spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| {
                    let container_id = statuses
                        .iter()
                        .find(|s| s.name == container.name && s.container_id.is_some())
                        .and_then(|s| s.container_id.clone());
                    ContainerSummary {
                        name: container.name.clone(),
                        image: container.image.clone(),
                        ready: container_id.is_some(),
                        container_id,
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let status = pod.status.as_ref();
    PodSummary {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone(),
        phase: status.and_then(|s| s.phase.clone()),
        pod_ip: status.and_then(|s| s.pod_ip.clone()),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        created_at: created_at(&pod.metadata),
        containers,
    }
}

pub fn node_summary(node: Node) -> NodeSummary {
    let name = node.metadata.name.unwrap_or_default();
    let Some(status) = node.status else {
        return NodeSummary {
            name,
            conditions: BTreeMap::new(),
            addresses: BTreeMap::new(),
            capacity: BTreeMap::new(),
            allocatable: BTreeMap::new(),
            kubelet_version: None,
        };
    };

    // Later entries overwrite earlier ones of the same type
    let addresses = status
        .addresses
        .unwrap_or_default()
        .into_iter()
        .map(|a| (a.type_, a.address))
        .collect();

    NodeSummary {
        name,
        conditions: node_conditions(status.conditions.as_deref()),
        addresses,
        capacity: quantities(status.capacity.as_ref()),
        allocatable: quantities(status.allocatable.as_ref()),
        kubelet_version: status.node_info.map(|info| info.kubelet_version),
    }
}

fn node_conditions(
    conditions: Option<&[k8s_openapi::api::core::v1::NodeCondition]>,
) -> BTreeMap<String, String> {
    conditions
        .unwrap_or_default()
        .iter()
        .map(|c| (c.type_.clone(), c.status.clone()))
        .collect()
}

fn container_state(status: &ContainerStatus) -> Option<ContainerStateSummary> {
    let state = status.state.as_ref()?;
    if let Some(waiting) = &state.waiting {
        return Some(ContainerStateSummary::Waiting {
            reason: waiting.reason.clone(),
            message: waiting.message.clone(),
        });
    }
    state
        .terminated
        .as_ref()
        .map(|terminated| ContainerStateSummary::Terminated {
            reason: terminated.reason.clone(),
            message: terminated.message.clone(),
            exit_code: terminated.exit_code,
        })
}

pub fn failed_pod_summary(pod: Pod) -> FailedPodSummary {
    let container_statuses = container_statuses(&pod)
        .iter()
        .map(|s| ContainerStatusSummary {
            name: s.name.clone(),
            restart_count: s.restart_count,
            state: container_state(s),
        })
        .collect();

    let node_name = pod.spec.and_then(|s| s.node_name);
    let status = pod.status.unwrap_or_default();
    FailedPodSummary {
        name: pod.metadata.name.unwrap_or_default(),
        namespace: pod.metadata.namespace,
        phase: status.phase,
        node_name,
        message: status.message,
        reason: status.reason,
        container_statuses,
    }
}

// ============================================================================
// Workload and service summaries
// ============================================================================

pub fn deployment_summary(deploy: Deployment) -> DeploymentSummary {
    let spec = deploy.spec.unwrap_or_default();
    let status = deploy.status.unwrap_or_default();
    DeploymentSummary {
        created_at: created_at(&deploy.metadata),
        name: deploy.metadata.name.unwrap_or_default(),
        namespace: deploy.metadata.namespace,
        replicas: spec.replicas,
        available_replicas: status.available_replicas,
        ready_replicas: status.ready_replicas,
        strategy: spec.strategy.and_then(|s| s.type_),
    }
}

pub fn service_summary(service: Service) -> ServiceSummary {
    let spec = service.spec.unwrap_or_default();
    let ports = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| ServicePortSummary {
            name: p.name,
            port: p.port,
            target_port: p.target_port.map(|t| match t {
                IntOrString::Int(port) => serde_json::Value::from(port),
                IntOrString::String(name) => serde_json::Value::from(name),
            }),
            protocol: p.protocol,
            node_port: p.node_port,
        })
        .collect();

    ServiceSummary {
        created_at: created_at(&service.metadata),
        name: service.metadata.name.unwrap_or_default(),
        namespace: service.metadata.namespace,
        service_type: spec.type_,
        cluster_ip: spec.cluster_ip,
        external_ips: spec.external_ips.unwrap_or_default(),
        ports,
        selector: spec.selector.unwrap_or_default(),
    }
}

pub fn event_summary(event: Event) -> EventSummary {
    let object = format!(
        "{}/{}",
        event.involved_object.kind.unwrap_or_default(),
        event.involved_object.name.unwrap_or_default()
    );
    EventSummary {
        first_time: timestamp(event.first_timestamp.as_ref()),
        last_time: timestamp(event.last_timestamp.as_ref()),
        event_type: event.type_,
        reason: event.reason,
        message: event.message,
        object,
        namespace: event.metadata.namespace,
        count: event.count,
    }
}

// ============================================================================
// Troubleshooting reports
// ============================================================================

/// Summarize a pending pod, explained by its most recent event.
/// Events without a last timestamp count as the oldest.
pub fn pending_pod_summary(pod: &Pod, events: &[Event]) -> PendingPodSummary {
    let latest = events
        .iter()
        .max_by_key(|e| e.last_timestamp.as_ref().map(|t| t.0));

    let (reason, message) = match latest {
        Some(event) => (event.reason.clone(), event.message.clone()),
        None => (Some(UNKNOWN_PENDING_REASON.to_string()), None),
    };

    PendingPodSummary {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone(),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        reason,
        message,
        created_at: created_at(&pod.metadata),
    }
}

/// Containers restarted more than `threshold` times; `None` when there are none
pub fn high_restart_summary(pod: &Pod, threshold: i32) -> Option<HighRestartPodSummary> {
    let containers: Vec<RestartingContainer> = container_statuses(pod)
        .iter()
        .filter(|s| s.restart_count > threshold)
        .map(|s| RestartingContainer {
            name: s.name.clone(),
            restart_count: s.restart_count,
            ready: s.ready,
            image: s.image.clone(),
        })
        .collect();

    if containers.is_empty() {
        return None;
    }

    Some(HighRestartPodSummary {
        name: pod.metadata.name.clone().unwrap_or_default(),
        namespace: pod.metadata.namespace.clone(),
        node_name: pod.spec.as_ref().and_then(|s| s.node_name.clone()),
        containers,
    })
}

/// Requested CPU cores and memory bytes summed over every container of `pods`
fn requested_resources<'a>(pods: impl IntoIterator<Item = &'a Pod>) -> (f64, u64) {
    let mut cpu = 0.0;
    let mut memory: u64 = 0;

    let requests = pods
        .into_iter()
        .filter_map(|pod| pod.spec.as_ref())
        .flat_map(|spec| spec.containers.iter())
        .filter_map(|c| c.resources.as_ref().and_then(|r| r.requests.as_ref()));

    for request in requests {
        if let Some(q) = request.get("cpu") {
            cpu += parse_cpu(&q.0).unwrap_or(0.0);
        }
        if let Some(q) = request.get("memory") {
            memory = memory.saturating_add(parse_memory(&q.0).unwrap_or(0));
        }
    }

    (cpu, memory)
}

/// Pod, CPU and memory usage of a node against its allocatable resources
pub fn node_capacity_summary(node: &Node, pods: &[&Pod]) -> NodeCapacitySummary {
    let status = node.status.as_ref();
    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let allocatable_value = |key: &str| allocatable.and_then(|a| a.get(key)).map(|q| q.0.as_str());

    let pod_capacity = allocatable_value("pods")
        .and_then(|q| q.parse::<u64>().ok())
        .unwrap_or(0);
    let cpu_allocatable = allocatable_value("cpu").and_then(parse_cpu).unwrap_or(0.0);
    let memory_allocatable = allocatable_value("memory").and_then(parse_memory).unwrap_or(0);

    let (cpu_requested, memory_requested) = requested_resources(pods.iter().copied());
    let used = pods.len() as u64;

    NodeCapacitySummary {
        name: node.metadata.name.clone().unwrap_or_default(),
        pods: PodUsage {
            used,
            capacity: pod_capacity,
            percent_used: percent(used as f64, pod_capacity as f64),
        },
        cpu: CpuUsage {
            requested: round2(cpu_requested),
            allocatable: round2(cpu_allocatable),
            percent_used: percent(cpu_requested, cpu_allocatable),
        },
        memory: MemoryUsage {
            requested: memory_requested,
            requested_human: format_bytes(memory_requested),
            allocatable: memory_allocatable,
            allocatable_human: format_bytes(memory_allocatable),
            percent_used: percent(memory_requested as f64, memory_allocatable as f64),
        },
        conditions: node_conditions(status.and_then(|s| s.conditions.as_deref())),
    }
}

/// Capacity report for every node, counting the pods scheduled onto each
pub fn node_capacity(nodes: &[Node], pods: &[Pod]) -> Vec<NodeCapacitySummary> {
    let mut by_node: HashMap<&str, Vec<&Pod>> = HashMap::new();
    for pod in pods {
        if let Some(node_name) = pod.spec.as_ref().and_then(|s| s.node_name.as_deref()) {
            by_node.entry(node_name).or_default().push(pod);
        }
    }

    nodes
        .iter()
        .map(|node| {
            let scheduled = node
                .metadata
                .name
                .as_deref()
                .and_then(|name| by_node.get(name))
                .map(Vec::as_slice)
                .unwrap_or_default();
            node_capacity_summary(node, scheduled)
        })
        .collect()
}

fn has_owner(metadata: &ObjectMeta) -> bool {
    metadata
        .owner_references
        .as_ref()
        .is_some_and(|refs| !refs.is_empty())
}

fn is_system(metadata: &ObjectMeta) -> bool {
    metadata
        .name
        .as_deref()
        .is_some_and(|n| n.starts_with(SYSTEM_PREFIX))
        || metadata.namespace.as_deref() == Some(SYSTEM_NAMESPACE)
}

fn orphan(metadata: &ObjectMeta, secret_type: Option<String>) -> OrphanSummary {
    OrphanSummary {
        name: metadata.name.clone().unwrap_or_default(),
        namespace: metadata.namespace.clone(),
        secret_type,
        created_at: created_at(metadata),
    }
}

/// Objects without owner references, skipping system objects and
/// Kubernetes-managed secret types
pub fn orphaned_resources(
    pods: &[Pod],
    services: &[Service],
    claims: &[PersistentVolumeClaim],
    config_maps: &[ConfigMap],
    secrets: &[Secret],
) -> OrphanedResources {
    let unowned_user = |m: &ObjectMeta| !has_owner(m) && !is_system(m);

    OrphanedResources {
        pods: pods
            .iter()
            .map(|p| &p.metadata)
            .filter(|m| unowned_user(m))
            .map(|m| orphan(m, None))
            .collect(),
        services: services
            .iter()
            .map(|s| &s.metadata)
            .filter(|m| unowned_user(m) && m.name.as_deref() != Some("kubernetes"))
            .map(|m| orphan(m, None))
            .collect(),
        persistent_volume_claims: claims
            .iter()
            .map(|c| &c.metadata)
            .filter(|m| !has_owner(m))
            .map(|m| orphan(m, None))
            .collect(),
        config_maps: config_maps
            .iter()
            .map(|c| &c.metadata)
            .filter(|m| unowned_user(m))
            .map(|m| orphan(m, None))
            .collect(),
        secrets: secrets
            .iter()
            .filter(|s| unowned_user(&s.metadata))
            .filter(|s| {
                !s.type_
                    .as_deref()
                    .is_some_and(|t| t.starts_with("kubernetes.io/"))
            })
            .map(|s| orphan(&s.metadata, s.type_.clone()))
            .collect(),
    }
}
