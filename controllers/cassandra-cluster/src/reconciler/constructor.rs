//! Desired-state builders
//!
//! Pure functions from a `CassandraCluster` to the objects the controller
//! persists. The same cluster always yields identical objects, each stamped
//! with its fingerprint. Builders never talk to the API server.

use crate::error::ControllerError;
use crate::reconcile_helpers::stamp_fingerprint;
use crds::{CassandraCluster, add_managed_by_label};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    Affinity, Container, ContainerPort, EmptyDirVolumeSource, EnvVar, EnvVarSource, ExecAction,
    ObjectFieldSelector, PersistentVolumeClaim, PersistentVolumeClaimSpec, PodAffinityTerm,
    PodAntiAffinity, PodSpec, PodTemplateSpec, Probe, ResourceRequirements, Service, ServicePort,
    ServiceSpec, Volume, VolumeMount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// Name of the per-replica data volume claim
pub const DATA_VOLUME_NAME: &str = "server-data";
const DATA_MOUNT_PATH: &str = "/var/lib/cassandra";
const DATA_STORAGE_CLASS: &str = "server-storage";
const DATA_STORAGE_SIZE: &str = "5Gi";

const SERVER_CONFIG_VOLUME: &str = "server-config";
const SERVER_LOGS_VOLUME: &str = "server-logs";
const SERVER_CONFIG_INIT_CONTAINER: &str = "server-config-init";

const CASSANDRA_CONTAINER: &str = "cassandra";
const CASSANDRA_IMAGE: &str = "cassandra:3.11.7";
const SERVER_VERSION: &str = "3.11.6";
const SERVER_TYPE: &str = "cassandra";
const CPU: &str = "2";
const MEMORY: &str = "2Gi";

const CQL_PORT: i32 = 9042;
const INTRA_NODE_PORT: i32 = 7000;

const HOSTNAME_TOPOLOGY_KEY: &str = "kubernetes.io/hostname";

fn object_meta(
    cluster: &CassandraCluster,
    name: String,
    labels: BTreeMap<String, String>,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name),
        namespace: cluster.metadata.namespace.clone(),
        labels: Some(labels),
        ..Default::default()
    }
}

fn managed_cluster_labels(cluster: &CassandraCluster) -> BTreeMap<String, String> {
    let mut labels = cluster.cluster_labels();
    add_managed_by_label(&mut labels);
    labels
}

/// Headless service selecting every node of the cluster, published before
/// the nodes are ready so peers can resolve each other during bootstrap.
fn new_headless_service(cluster: &CassandraCluster, name: String) -> Service {
    stamp_fingerprint(Service {
        metadata: object_meta(cluster, name, managed_cluster_labels(cluster)),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            cluster_ip: Some("None".to_string()),
            selector: Some(cluster.cluster_labels()),
            publish_not_ready_addresses: Some(true),
            ports: Some(vec![
                ServicePort {
                    name: Some("cql".to_string()),
                    port: CQL_PORT,
                    ..Default::default()
                },
                ServicePort {
                    name: Some("intra-node".to_string()),
                    port: INTRA_NODE_PORT,
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Service addressing every node, ready or not.
pub fn new_all_pods_service(cluster: &CassandraCluster) -> Service {
    new_headless_service(cluster, cluster.all_pods_service_name())
}

/// Service nodes resolve as their seed list.
///
/// Every node is a seed candidate; the selector is the cluster selector.
pub fn new_seed_service(cluster: &CassandraCluster) -> Service {
    new_headless_service(cluster, cluster.seed_service_name())
}

/// StatefulSet running one rack.
pub fn new_stateful_set(
    cluster: &CassandraCluster,
    datacenter: &str,
    rack: &str,
    replicas: i32,
) -> Result<StatefulSet, ControllerError> {
    let template = build_pod_template_spec(cluster, datacenter, rack)?;

    Ok(stamp_fingerprint(StatefulSet {
        metadata: object_meta(
            cluster,
            cluster.stateful_set_name(datacenter, rack),
            managed_cluster_labels(cluster),
        ),
        spec: Some(StatefulSetSpec {
            replicas: Some(replicas),
            selector: LabelSelector {
                match_labels: Some(cluster.rack_labels(datacenter, rack)),
                ..Default::default()
            },
            service_name: cluster.all_pods_service_name().into(),
            template,
            volume_claim_templates: Some(vec![new_data_volume_claim_template(cluster)]),
            ..Default::default()
        }),
        ..Default::default()
    }))
}

/// Pod template for one rack: config init step, the Cassandra container,
/// scratch volumes and host anti-affinity.
pub fn build_pod_template_spec(
    cluster: &CassandraCluster,
    datacenter: &str,
    rack: &str,
) -> Result<PodTemplateSpec, ControllerError> {
    let mut labels = cluster.rack_labels(datacenter, rack);
    add_managed_by_label(&mut labels);

    let init_containers = vec![build_server_config_init_container(cluster, datacenter, rack)?];
    let server_mounts: Vec<VolumeMount> = init_containers
        .iter()
        .flat_map(|c| c.volume_mounts.iter().flatten().cloned())
        .collect();

    Ok(PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            ..Default::default()
        }),
        spec: Some(PodSpec {
            affinity: Some(Affinity {
                pod_anti_affinity: Some(calculate_pod_anti_affinity(cluster)),
                ..Default::default()
            }),
            service_account_name: Some("default".to_string()),
            volumes: Some(create_volumes()),
            init_containers: Some(init_containers),
            containers: build_containers(server_mounts),
            ..Default::default()
        }),
    })
}

fn field_ref(field_path: &str) -> Option<EnvVarSource> {
    Some(EnvVarSource {
        field_ref: Some(ObjectFieldSelector {
            field_path: field_path.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn env(name: &str, value: &str) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.to_string()),
        ..Default::default()
    }
}

/// Init container rendering the node configuration into the shared config
/// volume. A config that cannot be rendered fails the whole build.
pub fn build_server_config_init_container(
    cluster: &CassandraCluster,
    datacenter: &str,
    rack: &str,
) -> Result<Container, ControllerError> {
    let seed_service = cluster.seed_service_name();
    let config = server_config::render(
        &[seed_service.as_str()],
        &cluster.spec.name,
        datacenter,
        cluster.spec.config.as_ref(),
    )?;

    Ok(Container {
        name: SERVER_CONFIG_INIT_CONTAINER.to_string(),
        image: Some(cluster.config_builder_image().to_string()),
        volume_mounts: Some(vec![VolumeMount {
            name: SERVER_CONFIG_VOLUME.to_string(),
            mount_path: "/config".to_string(),
            ..Default::default()
        }]),
        env: Some(vec![
            env("CONFIG_FILE_DATA", &config),
            EnvVar {
                name: "POD_IP".to_string(),
                value_from: field_ref("status.podIP"),
                ..Default::default()
            },
            EnvVar {
                name: "HOST_IP".to_string(),
                value_from: field_ref("status.hostIP"),
                ..Default::default()
            },
            env("USE_HOST_IP_FOR_BROADCAST", "false"),
            env("RACK_NAME", rack),
            env("PRODUCT_VERSION", SERVER_VERSION),
            env("PRODUCT_NAME", SERVER_TYPE),
            env("DSE_VERSION", SERVER_VERSION),
        ]),
        ..Default::default()
    })
}

fn cpu_and_memory() -> BTreeMap<String, Quantity> {
    BTreeMap::from([
        ("cpu".to_string(), Quantity(CPU.to_string())),
        ("memory".to_string(), Quantity(MEMORY.to_string())),
    ])
}

/// The Cassandra container. It mounts everything the init containers
/// mounted plus the data volume.
pub fn build_containers(mut server_mounts: Vec<VolumeMount>) -> Vec<Container> {
    server_mounts.push(VolumeMount {
        name: DATA_VOLUME_NAME.to_string(),
        mount_path: DATA_MOUNT_PATH.to_string(),
        ..Default::default()
    });

    vec![Container {
        name: CASSANDRA_CONTAINER.to_string(),
        image: Some(CASSANDRA_IMAGE.to_string()),
        resources: Some(ResourceRequirements {
            limits: Some(cpu_and_memory()),
            requests: Some(cpu_and_memory()),
            ..Default::default()
        }),
        ports: Some(vec![
            ContainerPort {
                name: Some("cql".to_string()),
                container_port: CQL_PORT,
                ..Default::default()
            },
            ContainerPort {
                name: Some("intra-node".to_string()),
                container_port: INTRA_NODE_PORT,
                ..Default::default()
            },
        ]),
        readiness_probe: Some(create_cassandra_probe(20, 10, 5)),
        liveness_probe: Some(create_cassandra_probe(60, 30, 10)),
        volume_mounts: Some(server_mounts),
        ..Default::default()
    }]
}

/// Fixed-size exclusive storage claim, one per replica.
pub fn new_data_volume_claim_template(cluster: &CassandraCluster) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(DATA_VOLUME_NAME.to_string()),
            labels: Some(cluster.cluster_labels()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: Some(DATA_STORAGE_CLASS.to_string()),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(DATA_STORAGE_SIZE.to_string()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Keeps two nodes of the same cluster off the same host.
pub fn calculate_pod_anti_affinity(cluster: &CassandraCluster) -> PodAntiAffinity {
    PodAntiAffinity {
        required_during_scheduling_ignored_during_execution: Some(vec![PodAffinityTerm {
            label_selector: Some(LabelSelector {
                match_labels: Some(cluster.cluster_labels()),
                ..Default::default()
            }),
            topology_key: HOSTNAME_TOPOLOGY_KEY.to_string(),
            ..Default::default()
        }]),
        ..Default::default()
    }
}

/// Scratch volumes shared between the init step and the server.
pub fn create_volumes() -> Vec<Volume> {
    [SERVER_CONFIG_VOLUME, SERVER_LOGS_VOLUME]
        .into_iter()
        .map(|name| Volume {
            name: name.to_string(),
            empty_dir: Some(EmptyDirVolumeSource::default()),
            ..Default::default()
        })
        .collect()
}

/// Probe running `nodetool status`, timings in seconds
pub fn create_cassandra_probe(delay: i32, period: i32, timeout: i32) -> Probe {
    Probe {
        initial_delay_seconds: Some(delay),
        period_seconds: Some(period),
        timeout_seconds: Some(timeout),
        exec: Some(ExecAction {
            command: Some(vec![
                "/bin/bash".to_string(),
                "-c".to_string(),
                "nodetool status".to_string(),
            ]),
        }),
        ..Default::default()
    }
}

