//! Observed-state store for the Cassandra operator
//!
//! Abstracts the handful of Kubernetes API calls the reconciliation engine
//! makes (get/create/replace for `CassandraCluster`, `Service` and
//! `StatefulSet`) behind the [`ClusterStore`] trait so the engine can be
//! exercised against an in-memory store in unit tests.
//!
//! # Example
//!
//! ```no_run
//! use cluster_store::{ClusterStore, KubeClusterStore, ObjectKey};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let store = KubeClusterStore::new(client);
//!
//! let cluster = store.get_cluster(&ObjectKey::new("cassandra", "demo")).await?;
//! println!("{} datacenters", cluster.spec.datacenters.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod key;
#[path = "trait.rs"]
pub mod store_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::KubeClusterStore;
pub use error::StoreError;
pub use key::{ObjectKey, ResourceKind};
pub use store_trait::ClusterStore;
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockClusterStore, MockFailure, MockOperation, WriteRecord};
