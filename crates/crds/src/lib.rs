//! Cassandra Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the Cassandra operator.

pub mod cassandra_cluster;

pub use cassandra_cluster::*;
