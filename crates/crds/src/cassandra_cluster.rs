//! CassandraCluster CRD
//!
//! Declares the target topology of a Cassandra cluster: its name, the
//! datacenters and racks it spans, how many nodes run in each rack, and a
//! freeform configuration overlay merged into the generated node config.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label carrying the cluster name on every managed object
pub const CLUSTER_LABEL: &str = "cassandra.apache.org/cluster";

/// Label carrying the datacenter name on per-rack objects
pub const DATACENTER_LABEL: &str = "cassandra.apache.org/datacenter";

/// Label carrying the rack name on per-rack objects
pub const RACK_LABEL: &str = "cassandra.apache.org/rack";

/// Standard label marking objects created by this operator
pub const MANAGED_BY_LABEL: &str = "app.kubernetes.io/managed-by";

/// Value of [`MANAGED_BY_LABEL`] on operator-owned objects
pub const MANAGED_BY_LABEL_VALUE: &str = "cassandra-operator";

const DEFAULT_CONFIG_BUILDER_IMAGE: &str = "datastax/cass-config-builder:1.0.1";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[kube(
    group = "cassandra.apache.org",
    version = "v1alpha1",
    kind = "CassandraCluster",
    namespaced,
    shortname = "cc"
)]
#[serde(rename_all = "camelCase")]
pub struct CassandraClusterSpec {
    /// Cluster name. Immutable once created; every child object name is
    /// derived from it.
    pub name: String,

    /// Datacenters making up the cluster
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub datacenters: Vec<Datacenter>,

    /// Free-form node configuration merged over the generated model values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schemars(schema_with = "preserve_unknown_fields")]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Datacenter {
    /// Datacenter name
    pub name: String,

    /// Number of Cassandra nodes to run in each rack of this datacenter
    #[serde(default)]
    pub nodes_per_rack: i32,

    /// Racks in this datacenter
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub racks: Vec<Rack>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Rack {
    /// Rack name
    pub name: String,
}

fn preserve_unknown_fields(_generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    schemars::json_schema!({
        "type": "object",
        "x-kubernetes-preserve-unknown-fields": true
    })
}

impl CassandraCluster {
    /// Labels identifying every object that belongs to this cluster.
    pub fn cluster_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(CLUSTER_LABEL.to_string(), self.spec.name.clone())])
    }

    /// Labels identifying the pods of a single rack.
    pub fn rack_labels(&self, datacenter: &str, rack: &str) -> BTreeMap<String, String> {
        let mut labels = self.cluster_labels();
        labels.insert(DATACENTER_LABEL.to_string(), datacenter.to_string());
        labels.insert(RACK_LABEL.to_string(), rack.to_string());
        labels
    }

    /// Name of the headless service exposing every node, ready or not.
    pub fn all_pods_service_name(&self) -> String {
        format!("{}-all-pods-service", self.spec.name)
    }

    /// Name of the headless service nodes use as their seed list.
    pub fn seed_service_name(&self) -> String {
        format!("{}-seed-service", self.spec.name)
    }

    /// Name of the StatefulSet running the given rack.
    ///
    /// Other tooling relies on the `<cluster>-<dc>-<rack>-sts` convention.
    pub fn stateful_set_name(&self, datacenter: &str, rack: &str) -> String {
        format!("{}-{}-{}-sts", self.spec.name, datacenter, rack)
    }

    /// Image used by the init container that renders node configuration.
    pub fn config_builder_image(&self) -> &'static str {
        DEFAULT_CONFIG_BUILDER_IMAGE
    }
}

/// Marks a label set as owned by the operator.
pub fn add_managed_by_label(labels: &mut BTreeMap<String, String>) {
    labels.insert(MANAGED_BY_LABEL.to_string(), MANAGED_BY_LABEL_VALUE.to_string());
}

/// Whether a label set carries the operator's managed-by marker.
pub fn has_managed_by_label(labels: &BTreeMap<String, String>) -> bool {
    labels.get(MANAGED_BY_LABEL).is_some_and(|v| v == MANAGED_BY_LABEL_VALUE)
}
