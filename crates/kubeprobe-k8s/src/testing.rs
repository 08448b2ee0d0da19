//! In-memory [`ClusterClient`] that records every call

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service,
};
use kube::ResourceExt;
use parking_lot::Mutex;

use crate::client::{ClusterClient, ResourceObject};
use crate::error::ClusterError;
use kubeprobe_types::ResourceRef;

/// Serves fixed objects, or fails calls when built with [`FakeClusterClient::failing`]
/// or [`FakeClusterClient::failing_on`]
#[derive(Default)]
pub struct FakeClusterClient {
    pub namespaces: Vec<Namespace>,
    pub pods: Vec<Pod>,
    pub nodes: Vec<Node>,
    pub deployments: Vec<Deployment>,
    pub services: Vec<Service>,
    pub events: Vec<Event>,
    pub claims: Vec<PersistentVolumeClaim>,
    pub config_maps: Vec<ConfigMap>,
    pub secrets: Vec<Secret>,
    pub resources: Vec<ResourceObject>,
    failure: Option<ClusterError>,
    /// Only calls whose label starts with this prefix fail
    failing_call: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client whose every call returns `err`
    pub fn failing(err: ClusterError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }

    /// A client where only calls labelled `call` (e.g. `"list_nodes"`) return `err`
    pub fn failing_on(call: &str, err: ClusterError) -> Self {
        Self {
            failure: Some(err),
            failing_call: Some(call.to_string()),
            ..Self::default()
        }
    }

    pub fn with_namespaces(mut self, namespaces: Vec<Namespace>) -> Self {
        self.namespaces = namespaces;
        self
    }

    pub fn with_pods(mut self, pods: Vec<Pod>) -> Self {
        self.pods = pods;
        self
    }

    pub fn with_nodes(mut self, nodes: Vec<Node>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_deployments(mut self, deployments: Vec<Deployment>) -> Self {
        self.deployments = deployments;
        self
    }

    pub fn with_services(mut self, services: Vec<Service>) -> Self {
        self.services = services;
        self
    }

    pub fn with_events(mut self, events: Vec<Event>) -> Self {
        self.events = events;
        self
    }

    pub fn with_resource(mut self, resource: ResourceObject) -> Self {
        self.resources.push(resource);
        self
    }

    /// Calls made so far, in order, e.g. `"list_namespaced_pods:default"`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: impl Into<String>) -> Result<(), ClusterError> {
        let call = call.into();
        let fails = match &self.failing_call {
            Some(prefix) => call.starts_with(prefix.as_str()),
            None => true,
        };
        self.calls.lock().push(call);
        match &self.failure {
            Some(err) if fails => Err(err.clone()),
            _ => Ok(()),
        }
    }
}

fn in_namespace<K: ResourceExt + Clone>(items: &[K], namespace: Option<&str>) -> Vec<K> {
    items
        .iter()
        .filter(|item| namespace.is_none() || item.namespace().as_deref() == namespace)
        .cloned()
        .collect()
}

fn scope_label(namespace: Option<&str>) -> &str {
    namespace.unwrap_or("*")
}

fn object_meta(resource: &ResourceObject) -> (Option<String>, String) {
    match resource {
        ResourceObject::Pod(o) => (o.namespace(), o.name_any()),
        ResourceObject::Deployment(o) => (o.namespace(), o.name_any()),
        ResourceObject::Service(o) => (o.namespace(), o.name_any()),
        ResourceObject::ConfigMap(o) => (o.namespace(), o.name_any()),
        ResourceObject::Secret(o) => (o.namespace(), o.name_any()),
        ResourceObject::Job(o) => (o.namespace(), o.name_any()),
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClusterError> {
        self.record("list_namespaces")?;
        Ok(self.namespaces.clone())
    }

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        self.record(format!("list_namespaced_pods:{}", namespace))?;
        Ok(in_namespace(&self.pods, Some(namespace)))
    }

    async fn list_all_pods(&self) -> Result<Vec<Pod>, ClusterError> {
        self.record("list_all_pods")?;
        Ok(self.pods.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        self.record("list_nodes")?;
        Ok(self.nodes.clone())
    }

    async fn get_resource(&self, resource: &ResourceRef) -> Result<ResourceObject, ClusterError> {
        self.record(format!(
            "get_resource:{}/{}/{}",
            resource.namespace, resource.kind, resource.name
        ))?;
        self.resources
            .iter()
            .find(|r| {
                let (namespace, name) = object_meta(r);
                r.kind() == resource.kind
                    && name == resource.name
                    && namespace.as_deref() == Some(resource.namespace.as_str())
            })
            .cloned()
            .ok_or_else(|| {
                ClusterError::with_status(
                    404,
                    format!("{}s \"{}\" not found", resource.kind, resource.name),
                )
            })
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<Deployment>, ClusterError> {
        self.record(format!("list_deployments:{}", scope_label(namespace)))?;
        Ok(in_namespace(&self.deployments, namespace))
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ClusterError> {
        self.record(format!("list_services:{}", scope_label(namespace)))?;
        Ok(in_namespace(&self.services, namespace))
    }

    async fn list_events(&self, namespace: Option<&str>) -> Result<Vec<Event>, ClusterError> {
        self.record(format!("list_events:{}", scope_label(namespace)))?;
        Ok(in_namespace(&self.events, namespace))
    }

    async fn list_pod_events(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<Event>, ClusterError> {
        self.record(format!("list_pod_events:{}/{}", namespace, pod))?;
        Ok(in_namespace(&self.events, Some(namespace))
            .into_iter()
            .filter(|e| {
                e.involved_object.name.as_deref() == Some(pod)
                    && e.involved_object.kind.as_deref() == Some("Pod")
            })
            .collect())
    }

    async fn list_persistent_volume_claims(
        &self,
    ) -> Result<Vec<PersistentVolumeClaim>, ClusterError> {
        self.record("list_persistent_volume_claims")?;
        Ok(self.claims.clone())
    }

    async fn list_config_maps(&self) -> Result<Vec<ConfigMap>, ClusterError> {
        self.record("list_config_maps")?;
        Ok(self.config_maps.clone())
    }

    async fn list_secrets(&self) -> Result<Vec<Secret>, ClusterError> {
        self.record("list_secrets")?;
        Ok(self.secrets.clone())
    }
}
