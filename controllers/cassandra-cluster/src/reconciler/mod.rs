//! Reconciliation logic for CassandraCluster resources.
//!
//! A reconcile request names a cluster. The [`Reconciler`] fetches it, builds
//! an immutable [`ReconcileContext`] and runs the fixed step pipeline:
//!
//! 1. `services`: the all-pods and seed headless services
//! 2. `stateful_sets`: one StatefulSet per datacenter rack
//!
//! Order matters: pods resolve their peers through the services on first
//! boot, so the services must exist before any StatefulSet is written.
//! Each step reports a [`ReconcileResult`]; anything but `Continue` stops the
//! pipeline. The reconciler never retries internally; the watch loop owns
//! retry scheduling.

pub mod constructor;
pub mod fingerprint;
pub mod result;
pub mod services;
pub mod stateful_sets;

#[cfg(test)]
mod stateful_sets_test;

pub use result::ReconcileResult;

use crate::error::ControllerError;
use crate::reconcile_helpers::get_with_timeout;
use cluster_store::{ClusterStore, ObjectKey};
use crds::CassandraCluster;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::Resource;
use std::time::Duration;
use tracing::{debug, error, info};

/// Everything a step needs to know about the cluster being reconciled.
///
/// Built once per request and only read afterwards.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    /// The cluster as fetched, with its namespace filled in
    pub cluster: CassandraCluster,
    /// Namespace every child object is created in
    pub namespace: String,
}

impl ReconcileContext {
    /// Context for `cluster`, defaulting its namespace to the one in `key`
    pub fn new(mut cluster: CassandraCluster, key: &ObjectKey) -> Self {
        let namespace = cluster
            .metadata
            .namespace
            .get_or_insert_with(|| key.namespace.clone())
            .clone();
        Self { cluster, namespace }
    }

    /// Identity of a child object in the cluster's namespace
    pub fn key(&self, name: &str) -> ObjectKey {
        ObjectKey::new(&self.namespace, name)
    }

    /// Controller owner reference pointing at the cluster.
    ///
    /// Fails when the cluster has not been persisted yet (no uid).
    pub fn owner_reference(&self) -> Result<OwnerReference, ControllerError> {
        self.cluster.controller_owner_ref(&()).ok_or_else(|| {
            ControllerError::Ownership(format!(
                "CassandraCluster {}/{} has no uid",
                self.namespace,
                self.cluster.metadata.name.as_deref().unwrap_or_default()
            ))
        })
    }
}

/// One stage of the reconcile pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStep {
    /// Seed and all-pods headless Services
    HeadlessServices,
    /// One StatefulSet per datacenter rack
    StatefulSets,
}

/// Steps in execution order
pub const PIPELINE: [ReconcileStep; 2] =
    [ReconcileStep::HeadlessServices, ReconcileStep::StatefulSets];

/// Reconciles CassandraCluster resources.
pub struct Reconciler {
    pub(crate) store: Box<dyn ClusterStore>,
    pub(crate) request_timeout: Duration,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(store: impl ClusterStore + 'static, request_timeout: Duration) -> Self {
        Self {
            store: Box::new(store),
            request_timeout,
        }
    }

    /// Reconciles the cluster named by `key`.
    ///
    /// Returns `Ok(None)` when the cluster is converged (or gone),
    /// `Ok(Some(after))` when it should be looked at again after `after`
    /// without a new event, and `Err` when the caller should retry with
    /// backoff.
    pub async fn handle_request(
        &self,
        key: &ObjectKey,
    ) -> Result<Option<Duration>, ControllerError> {
        info!("Reconciling CassandraCluster {}", key);

        let cluster = get_with_timeout(
            &format!("get CassandraCluster {key}"),
            self.request_timeout,
            self.store.get_cluster(key),
        )
        .await
        .map_err(|e| {
            error!("Failed to fetch CassandraCluster {}: {}", key, e);
            e
        })?;

        let Some(cluster) = cluster else {
            debug!("CassandraCluster {} not found, it was deleted", key);
            return Ok(None);
        };

        if cluster.metadata.deletion_timestamp.is_some() {
            debug!("CassandraCluster {} is being deleted, children are garbage collected", key);
            return Ok(None);
        }

        if cluster.spec.name.is_empty() {
            return Err(ControllerError::InvalidConfig(format!(
                "CassandraCluster {key} has an empty spec.name"
            )));
        }

        let ctx = ReconcileContext::new(cluster, key);
        self.run_pipeline(&ctx).await
    }

    async fn run_pipeline(
        &self,
        ctx: &ReconcileContext,
    ) -> Result<Option<Duration>, ControllerError> {
        for step in PIPELINE {
            let result = self.run_step(step, ctx).await;
            match result {
                ReconcileResult::Continue => continue,
                ReconcileResult::Done => {
                    debug!(
                        "CassandraCluster {}/{} done after {:?}",
                        ctx.namespace, ctx.cluster.spec.name, step
                    );
                    return Ok(None);
                }
                ReconcileResult::Error(e) => {
                    error!(
                        "Reconcile step {:?} failed for CassandraCluster {}/{}: {}",
                        step, ctx.namespace, ctx.cluster.spec.name, e
                    );
                    return Err(e);
                }
            }
        }
        Ok(None)
    }

    async fn run_step(&self, step: ReconcileStep, ctx: &ReconcileContext) -> ReconcileResult {
        match step {
            ReconcileStep::HeadlessServices => self.check_headless_services(ctx).await,
            ReconcileStep::StatefulSets => self.check_stateful_sets(ctx).await,
        }
    }
}
