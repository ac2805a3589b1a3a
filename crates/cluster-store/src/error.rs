//! Store errors

use crate::key::ResourceKind;
use thiserror::Error;

/// Errors returned by [`crate::ClusterStore`] operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object does not exist
    #[error("{kind} {name} not found")]
    NotFound { kind: ResourceKind, name: String },

    /// A create raced with another writer that created the object first
    #[error("{kind} {name} already exists")]
    AlreadyExists { kind: ResourceKind, name: String },

    /// Optimistic concurrency check failed (stale resourceVersion)
    #[error("Conflict writing {kind} {name}: {message}")]
    Conflict {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    /// The API server answered with a server-side or throttling error
    #[error("API server unavailable for {kind} {name}: {message}")]
    Unavailable {
        kind: ResourceKind,
        name: String,
        message: String,
    },

    /// The object to write has no namespace or name
    #[error("Invalid {kind} object: {reason}")]
    InvalidObject { kind: ResourceKind, reason: String },

    /// Any other Kubernetes client error (transport, decoding, auth)
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),
}

impl StoreError {
    /// Classifies a kube client error for the given object.
    pub fn from_kube(err: kube::Error, kind: ResourceKind, name: &str) -> Self {
        let (code, reason, message) = match &err {
            kube::Error::Api(status) => {
                (Some(status.code), status.reason.clone(), status.message.clone())
            }
            _ => (None, String::new(), String::new()),
        };
        let name = name.to_string();
        match code {
            Some(404) => Self::NotFound { kind, name },
            Some(409) if reason == "AlreadyExists" => Self::AlreadyExists { kind, name },
            Some(409) => Self::Conflict { kind, name, message },
            Some(429) | Some(500..=599) => Self::Unavailable { kind, name, message },
            _ => Self::Kube(err),
        }
    }

    /// Whether the object was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a create lost a race against another creator.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: format!("{reason} from API server"),
            reason: reason.to_string(),
            code,
        })
    }

    fn classify(code: u16, reason: &str) -> StoreError {
        StoreError::from_kube(
            api_error(code, reason),
            ResourceKind::Service,
            "demo-seed-service",
        )
    }

    #[test]
    fn test_404_is_not_found() {
        let err = classify(404, "NotFound");
        assert!(err.is_not_found());
        assert!(matches!(
            err,
            StoreError::NotFound { kind: ResourceKind::Service, ref name }
                if name == "demo-seed-service"
        ));
    }

    #[test]
    fn test_409_already_exists_is_distinguished_from_conflict() {
        assert!(classify(409, "AlreadyExists").is_already_exists());

        let err = classify(409, "Conflict");
        assert!(!err.is_already_exists());
        assert!(matches!(
            err,
            StoreError::Conflict { ref message, .. } if message == "Conflict from API server"
        ));
    }

    #[test]
    fn test_throttling_and_server_errors_are_unavailable() {
        let retryable = [
            (503, "ServiceUnavailable"),
            (500, "InternalError"),
            (429, "TooManyRequests"),
        ];
        for (code, reason) in retryable {
            assert!(
                matches!(classify(code, reason), StoreError::Unavailable { .. }),
                "{code} should be retried as unavailable"
            );
        }
    }

    #[test]
    fn test_other_statuses_stay_kube_errors() {
        let err = classify(403, "Forbidden");
        assert!(matches!(
            err,
            StoreError::Kube(kube::Error::Api(ref response)) if response.code == 403
        ));
        assert!(!err.is_not_found());
    }
}
