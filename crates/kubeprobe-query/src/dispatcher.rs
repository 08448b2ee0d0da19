//! Dispatch of logical queries to the cluster client

use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::encode::{encode, render_document};
use crate::error::QueryError;
use kubeprobe_k8s::ClusterClient;
use kubeprobe_k8s::summarize::{self, DEFAULT_RESTART_THRESHOLD};
use kubeprobe_types::{
    DeploymentSummary, Encoding, EventSummary, FailedPodSummary, HighRestartPodSummary,
    NamespaceSummary, NodeCapacitySummary, NodeSummary, OrphanedResources, PendingPodSummary,
    PodSummary, ResourceRef, ServiceSummary,
};

/// Status used for cluster failures that carry no status of their own
pub const DEFAULT_ERROR_STATUS: u16 = 500;

const OK_STATUS: u16 = 200;

/// Namespace assumed for a pod whose metadata has none
const DEFAULT_NAMESPACE: &str = "default";

/// Event lookups in flight at once while explaining pending pods
const PENDING_EVENT_CONCURRENCY: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Status for cluster errors when none is propagated
    pub default_error_status: u16,
    /// Report the API server's own status (403, 404, ...) when it gives one
    pub propagate_cluster_status: bool,
    /// Encoding of list responses
    pub encoding: Encoding,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_error_status: DEFAULT_ERROR_STATUS,
            propagate_cluster_status: true,
            encoding: Encoding::Json,
        }
    }
}

/// Outcome of a query: an encoded payload, or `{"error": ...}` with its status
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryResponse {
    pub status: u16,
    pub body: String,
    pub encoding: Encoding,
}

impl QueryResponse {
    fn ok(body: String, encoding: Encoding) -> Self {
        Self {
            status: OK_STATUS,
            body,
            encoding,
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
            encoding: Encoding::Json,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Runs read-only queries against a shared cluster client
///
/// Typed methods (`namespaces`, `pods`, ...) return summaries or a
/// [`QueryError`]. The `list_*` and `get_resource_yaml` methods wrap them and
/// never fail: errors come back as a [`QueryResponse`] with an error status.
pub struct QueryDispatcher {
    client: Arc<dyn ClusterClient>,
    config: DispatcherConfig,
}

impl QueryDispatcher {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self::with_config(client, DispatcherConfig::default())
    }

    pub fn with_config(client: Arc<dyn ClusterClient>, config: DispatcherConfig) -> Self {
        Self { client, config }
    }

    // ------------------------------------------------------------------------
    // Typed queries
    // ------------------------------------------------------------------------

    pub async fn namespaces(&self) -> Result<Vec<NamespaceSummary>, QueryError> {
        let namespaces = self.client.list_namespaces().await?;
        Ok(namespaces
            .into_iter()
            .map(summarize::namespace_summary)
            .collect())
    }

    /// Pods in `namespace`, or in every namespace when `None`
    pub async fn pods(&self, namespace: Option<&str>) -> Result<Vec<PodSummary>, QueryError> {
        let pods = match namespace {
            Some(ns) => self.client.list_namespaced_pods(ns).await?,
            None => self.client.list_all_pods().await?,
        };
        Ok(pods.into_iter().map(summarize::pod_summary).collect())
    }

    pub async fn nodes(&self) -> Result<Vec<NodeSummary>, QueryError> {
        let nodes = self.client.list_nodes().await?;
        Ok(nodes.into_iter().map(summarize::node_summary).collect())
    }

    /// Pods in phase `Failed` across all namespaces
    pub async fn failed_pods(&self) -> Result<Vec<FailedPodSummary>, QueryError> {
        let pods = self.client.list_all_pods().await?;
        Ok(pods
            .into_iter()
            .filter(summarize::is_failed)
            .map(summarize::failed_pod_summary)
            .collect())
    }

    /// The named object as a YAML document; the kind is checked before any fetch
    pub async fn resource_document(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> Result<String, QueryError> {
        let resource = ResourceRef::parse(namespace, kind, name)?;
        let object = self.client.get_resource(&resource).await?;
        render_document(&object)
    }

    pub async fn deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DeploymentSummary>, QueryError> {
        let deployments = self.client.list_deployments(namespace).await?;
        Ok(deployments
            .into_iter()
            .map(summarize::deployment_summary)
            .collect())
    }

    pub async fn services(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<ServiceSummary>, QueryError> {
        let services = self.client.list_services(namespace).await?;
        Ok(services
            .into_iter()
            .map(summarize::service_summary)
            .collect())
    }

    pub async fn events(&self, namespace: Option<&str>) -> Result<Vec<EventSummary>, QueryError> {
        let events = self.client.list_events(namespace).await?;
        Ok(events.into_iter().map(summarize::event_summary).collect())
    }

    /// Pending pods, each explained by its most recent event
    pub async fn pending_pods(&self) -> Result<Vec<PendingPodSummary>, QueryError> {
        let pods = self.client.list_all_pods().await?;
        let pending = pods.iter().filter(|pod| summarize::is_pending(pod));

        stream::iter(pending.map(|pod| async move {
            let namespace = pod
                .metadata
                .namespace
                .as_deref()
                .unwrap_or(DEFAULT_NAMESPACE);
            let name = pod.metadata.name.as_deref().unwrap_or_default();
            let events = self.client.list_pod_events(namespace, name).await?;
            Ok::<_, QueryError>(summarize::pending_pod_summary(pod, &events))
        }))
        .buffered(PENDING_EVENT_CONCURRENCY)
        .try_collect()
        .await
    }

    /// Pods with a container restarted more than `threshold` times (default 5)
    pub async fn high_restart_pods(
        &self,
        threshold: Option<i32>,
    ) -> Result<Vec<HighRestartPodSummary>, QueryError> {
        let threshold = threshold.unwrap_or(DEFAULT_RESTART_THRESHOLD);
        let pods = self.client.list_all_pods().await?;
        Ok(pods
            .iter()
            .filter_map(|pod| summarize::high_restart_summary(pod, threshold))
            .collect())
    }

    pub async fn node_capacity(&self) -> Result<Vec<NodeCapacitySummary>, QueryError> {
        let (nodes, pods) =
            futures::try_join!(self.client.list_nodes(), self.client.list_all_pods())?;
        Ok(summarize::node_capacity(&nodes, &pods))
    }

    pub async fn orphaned_resources(&self) -> Result<OrphanedResources, QueryError> {
        let (pods, services, claims, config_maps, secrets) = futures::try_join!(
            self.client.list_all_pods(),
            self.client.list_services(None),
            self.client.list_persistent_volume_claims(),
            self.client.list_config_maps(),
            self.client.list_secrets(),
        )?;
        Ok(summarize::orphaned_resources(
            &pods,
            &services,
            &claims,
            &config_maps,
            &secrets,
        ))
    }

    // ------------------------------------------------------------------------
    // Encoded responses
    // ------------------------------------------------------------------------

    pub async fn list_namespaces(&self) -> QueryResponse {
        self.respond("list_namespaces", self.namespaces().await)
    }

    pub async fn list_pods(&self, namespace: Option<&str>) -> QueryResponse {
        self.respond("list_pods", self.pods(namespace).await)
    }

    pub async fn list_nodes(&self) -> QueryResponse {
        self.respond("list_nodes", self.nodes().await)
    }

    pub async fn list_failed_pods(&self) -> QueryResponse {
        self.respond("list_failed_pods", self.failed_pods().await)
    }

    pub async fn get_resource_yaml(
        &self,
        namespace: &str,
        kind: &str,
        name: &str,
    ) -> QueryResponse {
        match self.resource_document(namespace, kind, name).await {
            Ok(document) => QueryResponse::ok(document, Encoding::Yaml),
            Err(err) => self.fail("get_resource_yaml", err),
        }
    }

    pub async fn list_deployments(&self, namespace: Option<&str>) -> QueryResponse {
        self.respond("list_deployments", self.deployments(namespace).await)
    }

    pub async fn list_services(&self, namespace: Option<&str>) -> QueryResponse {
        self.respond("list_services", self.services(namespace).await)
    }

    pub async fn list_events(&self, namespace: Option<&str>) -> QueryResponse {
        self.respond("list_events", self.events(namespace).await)
    }

    pub async fn list_pending_pods(&self) -> QueryResponse {
        self.respond("list_pending_pods", self.pending_pods().await)
    }

    pub async fn list_high_restart_pods(&self, threshold: Option<i32>) -> QueryResponse {
        self.respond("list_high_restart_pods", self.high_restart_pods(threshold).await)
    }

    pub async fn node_capacity_report(&self) -> QueryResponse {
        self.respond("node_capacity", self.node_capacity().await)
    }

    pub async fn orphaned_resources_report(&self) -> QueryResponse {
        self.respond("orphaned_resources", self.orphaned_resources().await)
    }

    fn respond<T: Serialize>(
        &self,
        operation: &str,
        result: Result<T, QueryError>,
    ) -> QueryResponse {
        let encoded = result.and_then(|value| encode(&value, self.config.encoding));
        match encoded {
            Ok(body) => {
                debug!(operation, bytes = body.len(), "query succeeded");
                QueryResponse::ok(body, self.config.encoding)
            }
            Err(err) => self.fail(operation, err),
        }
    }

    fn fail(&self, operation: &str, err: QueryError) -> QueryResponse {
        let status = err.status(
            self.config.default_error_status,
            self.config.propagate_cluster_status,
        );
        warn!(operation, status, error = %err, "query failed");
        QueryResponse::error(status, &err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::{Event, Namespace, Node, Pod, Service};
    use kubeprobe_k8s::testing::FakeClusterClient;
    use kubeprobe_k8s::{ClusterError, ResourceObject, k8s_openapi};
    use serde_json::{Value, json};

    fn namespace(name: &str) -> Namespace {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": name, "creationTimestamp": "2024-01-15T10:30:00Z" },
            "status": { "phase": "Active" }
        }))
        .unwrap()
    }

    fn pod(name: &str, namespace: &str, phase: &str) -> Pod {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": name, "namespace": namespace },
            "spec": { "nodeName": "node1", "containers": [{ "name": "test-container", "image": "nginx" }] },
            "status": {
                "phase": phase,
                "containerStatuses": [{
                    "name": "test-container", "image": "nginx", "imageID": "", "ready": false,
                    "restartCount": 3, "containerID": "containerd://abc",
                    "state": { "waiting": { "reason": "CrashLoopBackOff", "message": "back-off 5m0s" } }
                }]
            }
        }))
        .unwrap()
    }

    fn deployment(name: &str, namespace: &str) -> Deployment {
        serde_json::from_value(json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": name, "namespace": namespace },
            "spec": { "replicas": 2, "selector": {}, "template": {} },
            "status": { "availableReplicas": 2, "readyReplicas": 2 }
        }))
        .unwrap()
    }

    fn service(name: &str, namespace: &str) -> Service {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": name, "namespace": namespace },
            "spec": { "type": "ClusterIP", "clusterIP": "10.96.0.1" }
        }))
        .unwrap()
    }

    fn event(name: &str, namespace: &str) -> Event {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": { "name": name, "namespace": namespace },
            "involvedObject": { "kind": "Pod", "name": "web" },
            "reason": "Pulled"
        }))
        .unwrap()
    }

    fn node(name: &str) -> Node {
        serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": { "name": name },
            "status": { "allocatable": { "cpu": "2", "memory": "4Gi", "pods": "10" } }
        }))
        .unwrap()
    }

    fn dispatcher(client: FakeClusterClient) -> (Arc<FakeClusterClient>, QueryDispatcher) {
        let client = Arc::new(client);
        let dispatcher = QueryDispatcher::new(client.clone());
        (client, dispatcher)
    }

    fn body(response: &QueryResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_list_namespaces_preserves_order() {
        let (client, dispatcher) = dispatcher(
            FakeClusterClient::new()
                .with_namespaces(vec![namespace("default"), namespace("kube-system")]),
        );

        let response = dispatcher.list_namespaces().await;
        assert_eq!(response.status, 200);
        let namespaces = body(&response);
        assert_eq!(namespaces.as_array().unwrap().len(), 2);
        assert_eq!(namespaces[0]["name"], "default");
        assert_eq!(namespaces[1]["name"], "kube-system");
        assert_eq!(namespaces[0]["phase"], "Active");
        assert_eq!(namespaces[0]["created_at"], "2024-01-15T10:30:00Z");
        assert_eq!(client.calls(), vec!["list_namespaces"]);
    }

    #[tokio::test]
    async fn test_list_namespaces_error() {
        let (_client, dispatcher) =
            dispatcher(FakeClusterClient::failing(ClusterError::new("connection refused")));

        let response = dispatcher.list_namespaces().await;
        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        assert_eq!(body(&response), json!({ "error": "connection refused" }));
    }

    #[tokio::test]
    async fn test_list_pods_namespaced_only() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_pods(vec![
            pod("test-pod", "default", "Running"),
            pod("other", "prod", "Running"),
        ]));

        let response = dispatcher.list_pods(Some("default")).await;
        let pods = body(&response);
        assert_eq!(pods.as_array().unwrap().len(), 1);
        assert_eq!(pods[0]["name"], "test-pod");
        assert_eq!(pods[0]["namespace"], "default");
        assert_eq!(pods[0]["containers"][0]["name"], "test-container");
        assert_eq!(pods[0]["containers"][0]["ready"], true);
        assert_eq!(client.calls(), vec!["list_namespaced_pods:default"]);
    }

    #[tokio::test]
    async fn test_list_pods_all_namespaces() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_pods(vec![
            pod("a", "default", "Running"),
            pod("b", "prod", "Running"),
        ]));

        let response = dispatcher.list_pods(None).await;
        assert_eq!(body(&response).as_array().unwrap().len(), 2);
        assert_eq!(client.calls(), vec!["list_all_pods"]);
    }

    #[tokio::test]
    async fn test_list_pods_error_is_structured() {
        let (_client, dispatcher) =
            dispatcher(FakeClusterClient::failing(ClusterError::new("timed out")));

        let response = dispatcher.list_pods(None).await;
        assert_eq!(response.status, 500);
        assert!(body(&response).get("error").is_some());
    }

    #[tokio::test]
    async fn test_cluster_status_propagates() {
        let (_client, dispatcher) = dispatcher(FakeClusterClient::failing(
            ClusterError::with_status(403, "nodes is forbidden"),
        ));
        assert_eq!(dispatcher.list_nodes().await.status, 403);

        let client = Arc::new(FakeClusterClient::failing(ClusterError::with_status(
            403,
            "nodes is forbidden",
        )));
        let dispatcher = QueryDispatcher::with_config(
            client,
            DispatcherConfig {
                propagate_cluster_status: false,
                ..Default::default()
            },
        );
        assert_eq!(dispatcher.list_nodes().await.status, 500);
    }

    #[tokio::test]
    async fn test_list_failed_pods_filters_phase() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_pods(vec![
            pod("running-pod", "default", "Running"),
            pod("failed-pod", "default", "Failed"),
            pod("pending-pod", "default", "Pending"),
        ]));

        let response = dispatcher.list_failed_pods().await;
        let failed = body(&response);
        assert_eq!(failed.as_array().unwrap().len(), 1);
        assert_eq!(failed[0]["name"], "failed-pod");
        assert_eq!(failed[0]["phase"], "Failed");
        let status = &failed[0]["container_statuses"][0];
        assert_eq!(status["name"], "test-container");
        assert_eq!(status["restart_count"], 3);
        assert_eq!(status["state"]["reason"], "CrashLoopBackOff");
        assert_eq!(status["state"]["message"], "back-off 5m0s");
        assert_eq!(client.calls(), vec!["list_all_pods"]);
    }

    #[tokio::test]
    async fn test_list_failed_pods_empty() {
        let (_client, dispatcher) = dispatcher(
            FakeClusterClient::new().with_pods(vec![pod("ok", "default", "Running")]),
        );

        let response = dispatcher.list_failed_pods().await;
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "[]");
    }

    #[tokio::test]
    async fn test_get_resource_yaml() {
        let object: Pod = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Pod",
            "metadata": { "name": "test-pod", "namespace": "default" }
        }))
        .unwrap();
        let (client, dispatcher) =
            dispatcher(FakeClusterClient::new().with_resource(ResourceObject::Pod(object)));

        let response = dispatcher.get_resource_yaml("default", "pod", "test-pod").await;
        assert_eq!(response.status, 200);
        assert_eq!(response.encoding, Encoding::Yaml);
        assert_eq!(
            response.body,
            "apiVersion: v1\nkind: Pod\nmetadata:\n  name: test-pod\n  namespace: default\n"
        );
        assert_eq!(client.calls(), vec!["get_resource:default/pod/test-pod"]);
    }

    #[tokio::test]
    async fn test_get_resource_yaml_unsupported_type() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new());

        let response = dispatcher
            .get_resource_yaml("default", "unsupported", "test")
            .await;
        assert_eq!(response.status, 400);
        let error = body(&response);
        assert!(
            error["error"]
                .as_str()
                .unwrap()
                .contains("Unsupported resource type")
        );
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_get_resource_yaml_not_found() {
        let (_client, dispatcher) = dispatcher(FakeClusterClient::new());

        let response = dispatcher.get_resource_yaml("default", "secret", "missing").await;
        assert_eq!(response.status, 404);
        assert!(body(&response)["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn test_yaml_list_encoding() {
        let client = Arc::new(FakeClusterClient::new().with_namespaces(vec![namespace("default")]));
        let dispatcher = QueryDispatcher::with_config(
            client,
            DispatcherConfig {
                encoding: Encoding::Yaml,
                ..Default::default()
            },
        );

        let response = dispatcher.list_namespaces().await;
        assert_eq!(response.encoding, Encoding::Yaml);
        assert!(response.body.starts_with("- name: default\n"));
    }

    #[tokio::test]
    async fn test_pending_pods_fetch_events_per_pod() {
        let event: Event = serde_json::from_value(json!({
            "apiVersion": "v1",
            "kind": "Event",
            "metadata": { "name": "waiting.1", "namespace": "default" },
            "involvedObject": { "kind": "Pod", "name": "waiting" },
            "reason": "FailedScheduling",
            "message": "0/3 nodes are available",
            "lastTimestamp": "2024-01-15T10:30:00Z"
        }))
        .unwrap();
        let (client, dispatcher) = dispatcher(
            FakeClusterClient::new()
                .with_pods(vec![
                    pod("waiting", "default", "Pending"),
                    pod("stuck", "prod", "Pending"),
                    pod("running", "default", "Running"),
                ])
                .with_events(vec![event]),
        );

        let pending = dispatcher.pending_pods().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].reason.as_deref(), Some("FailedScheduling"));
        assert_eq!(pending[1].reason.as_deref(), Some("Unknown"));

        let calls = client.calls();
        assert_eq!(calls[0], "list_all_pods");
        assert!(calls.contains(&"list_pod_events:default/waiting".to_string()));
        assert!(calls.contains(&"list_pod_events:prod/stuck".to_string()));
        assert_eq!(calls.len(), 3);
    }

    #[tokio::test]
    async fn test_high_restart_pods_threshold() {
        let (_client, dispatcher) = dispatcher(
            FakeClusterClient::new().with_pods(vec![pod("flappy", "default", "Running")]),
        );

        assert!(dispatcher.high_restart_pods(None).await.unwrap().is_empty());
        let pods = dispatcher.high_restart_pods(Some(2)).await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].containers[0].restart_count, 3);
    }

    #[tokio::test]
    async fn test_orphaned_resources_fetches_every_kind() {
        let (client, dispatcher) = dispatcher(
            FakeClusterClient::new().with_pods(vec![pod("lonely", "default", "Running")]),
        );

        let report = dispatcher.orphaned_resources().await.unwrap();
        assert_eq!(report.pods.len(), 1);

        let mut calls = client.calls();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                "list_all_pods",
                "list_config_maps",
                "list_persistent_volume_claims",
                "list_secrets",
                "list_services:*",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_deployments_namespace_rule() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_deployments(vec![
            deployment("web", "default"),
            deployment("api", "prod"),
        ]));

        let scoped = body(&dispatcher.list_deployments(Some("default")).await);
        assert_eq!(scoped.as_array().unwrap().len(), 1);
        assert_eq!(scoped[0]["name"], "web");
        assert_eq!(scoped[0]["available_replicas"], 2);

        let all = body(&dispatcher.list_deployments(None).await);
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(
            client.calls(),
            vec!["list_deployments:default", "list_deployments:*"]
        );
    }

    #[tokio::test]
    async fn test_list_services_namespace_rule() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_services(vec![
            service("web", "default"),
            service("api", "prod"),
        ]));

        let scoped = body(&dispatcher.list_services(Some("prod")).await);
        assert_eq!(scoped.as_array().unwrap().len(), 1);
        assert_eq!(scoped[0]["name"], "api");
        assert_eq!(scoped[0]["type"], "ClusterIP");

        let all = body(&dispatcher.list_services(None).await);
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(client.calls(), vec!["list_services:prod", "list_services:*"]);
    }

    #[tokio::test]
    async fn test_list_events_namespace_rule() {
        let (client, dispatcher) = dispatcher(FakeClusterClient::new().with_events(vec![
            event("web.1", "default"),
            event("web.2", "prod"),
        ]));

        let scoped = body(&dispatcher.list_events(Some("default")).await);
        assert_eq!(scoped.as_array().unwrap().len(), 1);
        assert_eq!(scoped[0]["object"], "Pod/web");

        let all = body(&dispatcher.list_events(None).await);
        assert_eq!(all.as_array().unwrap().len(), 2);
        assert_eq!(client.calls(), vec!["list_events:default", "list_events:*"]);
    }

    #[tokio::test]
    async fn test_list_failed_pods_error_is_structured() {
        let (_client, dispatcher) =
            dispatcher(FakeClusterClient::failing(ClusterError::new("connection reset")));

        let response = dispatcher.list_failed_pods().await;
        assert_eq!(response.status, 500);
        assert_eq!(body(&response), json!({ "error": "connection reset" }));
    }

    #[tokio::test]
    async fn test_node_capacity_report_fetches_nodes_and_pods() {
        let (client, dispatcher) = dispatcher(
            FakeClusterClient::new()
                .with_nodes(vec![node("node1")])
                .with_pods(vec![pod("web", "default", "Running")]),
        );

        let response = dispatcher.node_capacity_report().await;
        assert_eq!(response.status, 200);
        let report = body(&response);
        assert_eq!(report[0]["name"], "node1");
        assert_eq!(report[0]["pods"]["used"], 1);
        assert_eq!(report[0]["pods"]["capacity"], 10);

        let mut calls = client.calls();
        calls.sort();
        assert_eq!(calls, vec!["list_all_pods", "list_nodes"]);
    }

    #[tokio::test]
    async fn test_node_capacity_report_fails_when_either_fetch_fails() {
        for call in ["list_nodes", "list_all_pods"] {
            let (_client, dispatcher) = dispatcher(
                FakeClusterClient::failing_on(call, ClusterError::with_status(403, "forbidden"))
                    .with_nodes(vec![node("node1")]),
            );

            let response = dispatcher.node_capacity_report().await;
            assert_eq!(response.status, 403, "failing call: {}", call);
            assert_eq!(body(&response), json!({ "error": "forbidden" }));
        }
    }

    #[tokio::test]
    async fn test_pending_pods_event_failure() {
        let (_client, dispatcher) = dispatcher(
            FakeClusterClient::failing_on("list_pod_events", ClusterError::new("timed out"))
                .with_pods(vec![pod("waiting", "default", "Pending")]),
        );

        let response = dispatcher.list_pending_pods().await;
        assert_eq!(response.status, 500);
        assert_eq!(body(&response), json!({ "error": "timed out" }));
    }

    #[tokio::test]
    async fn test_pending_pods_keep_pod_order() {
        let pods: Vec<Pod> = (0..10)
            .map(|i| pod(&format!("pending-{}", i), "default", "Pending"))
            .collect();
        let (_client, dispatcher) = dispatcher(FakeClusterClient::new().with_pods(pods));

        let pending = dispatcher.pending_pods().await.unwrap();
        let names: Vec<_> = pending.iter().map(|p| p.name.clone()).collect();
        let expected: Vec<_> = (0..10).map(|i| format!("pending-{}", i)).collect();
        assert_eq!(names, expected);
    }
}
