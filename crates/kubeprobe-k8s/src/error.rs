//! Errors surfaced by the cluster client

/// A failed call to the Kubernetes API
///
/// `status` carries the HTTP code reported by the API server when there was
/// one (403, 404, ...); transport and config failures leave it empty.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ClusterError {
    pub status: Option<u16>,
    pub message: String,
}

impl ClusterError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

impl From<kube::Error> for ClusterError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => Self::with_status(
                response.code,
                format!("{} ({})", response.message, response.reason),
            ),
            other => Self::new(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    #[test]
    fn test_api_error_keeps_status() {
        let err: ClusterError = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "pods \"web\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        })
        .into();

        assert_eq!(err.status, Some(404));
        assert_eq!(err.to_string(), "pods \"web\" not found (NotFound)");
    }

    #[test]
    fn test_plain_error_has_no_status() {
        let err = ClusterError::new("connection refused");
        assert_eq!(err.status, None);
        assert_eq!(err.to_string(), "connection refused");
    }
}
