//! Query layer for kubeprobe
//!
//! This crate turns logical requests into cluster fetches, summarizes the
//! results, and encodes them as JSON or YAML. Every failure is caught here
//! and returned as a `{"error": ...}` payload with a status code.

mod dispatcher;
mod encode;
mod error;

pub use dispatcher::{DispatcherConfig, QueryDispatcher, QueryResponse};
pub use encode::{encode, render_document};
pub use error::QueryError;

// Re-export types used in our public API
pub use kubeprobe_k8s::{ClusterClient, ClusterError};
pub use kubeprobe_types::Encoding;
