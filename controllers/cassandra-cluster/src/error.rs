//! Controller-specific error types.
//!
//! This module defines the errors the CassandraCluster Controller reports
//! back to the watch loop, which schedules a retry with backoff for any of
//! them.

use cluster_store::StoreError;
use kube::Error as KubeError;
use server_config::ServerConfigError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the CassandraCluster Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes client error outside of a reconcile step
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Observed-state store error (transport, conflict, API server failure)
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A store call did not answer in time
    #[error("Timed out after {after:?} waiting to {operation}")]
    Timeout { operation: String, after: Duration },

    /// Node configuration could not be rendered from the cluster spec
    #[error("Server config error: {0}")]
    ServerConfig(#[from] ServerConfigError),

    /// The owner reference from the cluster to a child could not be set
    #[error("Ownership error: {0}")]
    Ownership(String),

    /// Invalid configuration (controller settings or cluster spec)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
