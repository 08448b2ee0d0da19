use kubeprobe_k8s::ClusterError;
use kubeprobe_types::UnsupportedResourceKind;

/// Status reported for requests rejected before reaching the cluster
pub const VALIDATION_STATUS: u16 = 400;

/// Status reported when a response cannot be encoded
pub const ENCODE_STATUS: u16 = 500;

/// Failure of a single query
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Rejected before any network call
    #[error(transparent)]
    Validation(#[from] UnsupportedResourceKind),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("failed to encode response: {0}")]
    Encode(String),
}

impl QueryError {
    /// Status code for this error.
    ///
    /// Cluster failures use the API server's own status when `propagate` is set
    /// and one was reported, `default_status` otherwise.
    pub fn status(&self, default_status: u16, propagate: bool) -> u16 {
        match self {
            Self::Validation(_) => VALIDATION_STATUS,
            Self::Cluster(err) => err
                .status
                .filter(|_| propagate)
                .unwrap_or(default_status),
            Self::Encode(_) => ENCODE_STATUS,
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

impl From<serde_yaml::Error> for QueryError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Encode(err.to_string())
    }
}
