//! Kubernetes client for kubeprobe

use std::fmt::Debug;

use anyhow::Context;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{
    ConfigMap, Event, Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service,
};
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Resource};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ClusterError;
use kubeprobe_types::{ResourceKind, ResourceRef};

/// A single object fetched for document rendering
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ResourceObject {
    Pod(Pod),
    Deployment(Deployment),
    Service(Service),
    ConfigMap(ConfigMap),
    Secret(Secret),
    Job(Job),
}

impl ResourceObject {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::Pod(_) => ResourceKind::Pod,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::Service(_) => ResourceKind::Service,
            Self::ConfigMap(_) => ResourceKind::ConfigMap,
            Self::Secret(_) => ResourceKind::Secret,
            Self::Job(_) => ResourceKind::Job,
        }
    }
}

/// Read-only access to a cluster
///
/// Implementations must be safe to share across concurrent requests. Every
/// method makes a single API call and never retries.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClusterError>;

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError>;

    async fn list_all_pods(&self) -> Result<Vec<Pod>, ClusterError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError>;

    async fn get_resource(&self, resource: &ResourceRef) -> Result<ResourceObject, ClusterError>;

    /// Deployments in `namespace`, or across all namespaces when `None`
    async fn list_deployments(&self, namespace: Option<&str>)
    -> Result<Vec<Deployment>, ClusterError>;

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ClusterError>;

    async fn list_events(&self, namespace: Option<&str>) -> Result<Vec<Event>, ClusterError>;

    /// Events whose involved object is the named pod
    async fn list_pod_events(&self, namespace: &str, pod: &str)
    -> Result<Vec<Event>, ClusterError>;

    async fn list_persistent_volume_claims(&self)
    -> Result<Vec<PersistentVolumeClaim>, ClusterError>;

    async fn list_config_maps(&self) -> Result<Vec<ConfigMap>, ClusterError>;

    async fn list_secrets(&self) -> Result<Vec<Secret>, ClusterError>;
}

/// Kubernetes client wrapper
#[derive(Clone)]
pub struct KubeClient {
    client: kube::Client,
    context: Option<String>,
}

impl KubeClient {
    /// Connect using a kubeconfig context, or infer the config when none is given.
    ///
    /// Inference tries the local kubeconfig first and falls back to the
    /// in-cluster service account.
    pub async fn new(context: Option<&str>) -> anyhow::Result<Self> {
        let config = match context {
            Some(context_name) => {
                let kubeconfig = Kubeconfig::read()
                    .context("Failed to read kubeconfig. Is kubectl configured?")?;
                kube::Config::from_custom_kubeconfig(
                    kubeconfig,
                    &KubeConfigOptions {
                        context: Some(context_name.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .context(format!(
                    "Failed to create config for context: {}",
                    context_name
                ))?
            }
            None => kube::Config::infer()
                .await
                .context("Failed to load kubeconfig or in-cluster configuration")?,
        };

        let client = kube::Client::try_from(config).context("Failed to create Kubernetes client")?;

        Ok(Self {
            client,
            context: context.map(str::to_string),
        })
    }

    /// The kubeconfig context this client was created for, if one was named
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Validate that the client can make API calls
    pub async fn check_connection(&self) -> Result<(), ClusterError> {
        let ns: Api<Namespace> = Api::all(self.client.clone());
        // Just try to list with limit 1 to validate auth
        ns.list(&ListParams::default().limit(1)).await?;
        Ok(())
    }

    /// Namespaced API, or cluster-wide when no namespace is given
    fn scoped<K>(&self, namespace: Option<&str>) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        }
    }

    async fn get_namespaced<K>(&self, resource: &ResourceRef) -> Result<K, ClusterError>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), &resource.namespace);
        Ok(api.get(&resource.name).await?)
    }
}

async fn list_items<K>(api: Api<K>, params: &ListParams) -> Result<Vec<K>, ClusterError>
where
    K: Clone + DeserializeOwned + Debug,
{
    Ok(api.list(params).await?.items)
}

#[async_trait]
impl ClusterClient for KubeClient {
    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ClusterError> {
        debug!("listing namespaces");
        list_items(Api::all(self.client.clone()), &ListParams::default()).await
    }

    async fn list_namespaced_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        debug!(namespace, "listing pods");
        list_items(self.scoped(Some(namespace)), &ListParams::default()).await
    }

    async fn list_all_pods(&self) -> Result<Vec<Pod>, ClusterError> {
        debug!("listing pods in all namespaces");
        list_items(self.scoped(None), &ListParams::default()).await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        debug!("listing nodes");
        list_items(Api::all(self.client.clone()), &ListParams::default()).await
    }

    async fn get_resource(&self, resource: &ResourceRef) -> Result<ResourceObject, ClusterError> {
        debug!(
            namespace = %resource.namespace,
            kind = %resource.kind,
            name = %resource.name,
            "fetching resource"
        );
        Ok(match resource.kind {
            ResourceKind::Pod => ResourceObject::Pod(self.get_namespaced(resource).await?),
            ResourceKind::Deployment => {
                ResourceObject::Deployment(self.get_namespaced(resource).await?)
            }
            ResourceKind::Service => ResourceObject::Service(self.get_namespaced(resource).await?),
            ResourceKind::ConfigMap => {
                ResourceObject::ConfigMap(self.get_namespaced(resource).await?)
            }
            ResourceKind::Secret => ResourceObject::Secret(self.get_namespaced(resource).await?),
            ResourceKind::Job => ResourceObject::Job(self.get_namespaced(resource).await?),
        })
    }

    async fn list_deployments(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<Deployment>, ClusterError> {
        debug!(?namespace, "listing deployments");
        list_items(self.scoped(namespace), &ListParams::default()).await
    }

    async fn list_services(&self, namespace: Option<&str>) -> Result<Vec<Service>, ClusterError> {
        debug!(?namespace, "listing services");
        list_items(self.scoped(namespace), &ListParams::default()).await
    }

    async fn list_events(&self, namespace: Option<&str>) -> Result<Vec<Event>, ClusterError> {
        debug!(?namespace, "listing events");
        list_items(self.scoped(namespace), &ListParams::default()).await
    }

    async fn list_pod_events(
        &self,
        namespace: &str,
        pod: &str,
    ) -> Result<Vec<Event>, ClusterError> {
        debug!(namespace, pod, "listing pod events");
        let selector = format!("involvedObject.name={},involvedObject.kind=Pod", pod);
        list_items(
            self.scoped(Some(namespace)),
            &ListParams::default().fields(&selector),
        )
        .await
    }

    async fn list_persistent_volume_claims(
        &self,
    ) -> Result<Vec<PersistentVolumeClaim>, ClusterError> {
        debug!("listing persistent volume claims in all namespaces");
        list_items(self.scoped(None), &ListParams::default()).await
    }

    async fn list_config_maps(&self) -> Result<Vec<ConfigMap>, ClusterError> {
        debug!("listing config maps in all namespaces");
        list_items(self.scoped(None), &ListParams::default()).await
    }

    async fn list_secrets(&self) -> Result<Vec<Secret>, ClusterError> {
        debug!("listing secrets in all namespaces");
        list_items(self.scoped(None), &ListParams::default()).await
    }
}
