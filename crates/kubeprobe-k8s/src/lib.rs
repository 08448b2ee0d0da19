//! Kubernetes client for kubeprobe
//!
//! This crate provides the [`ClusterClient`] capability used by the query
//! layer, its `kube`-backed implementation, and the functions that turn raw
//! API objects into summary records.

mod client;
mod error;
pub mod summarize;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::{ClusterClient, KubeClient, ResourceObject};
pub use error::ClusterError;

// Re-export types that are used in our public API
pub use k8s_openapi;
pub use kubeprobe_types::{ResourceKind, ResourceRef};
