//! Helper functions for common reconciliation patterns
//!
//! Every managed kind goes through the same get-or-create protocol: fetch by
//! identity under a timeout, create with an owner reference when missing,
//! compare fingerprints when present and replace on drift. The protocol is
//! written once here against [`ManagedResource`].

use crate::error::ControllerError;
use crate::reconciler::ReconcileContext;
use crate::reconciler::fingerprint::{
    add_hash_annotation, resources_have_same_hash, service_fingerprint, stateful_set_fingerprint,
};
use async_trait::async_trait;
use cluster_store::{ClusterStore, ObjectKey, ResourceKind, StoreError};
use k8s_openapi::api::apps::v1::StatefulSet;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::Resource;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A child kind the controller creates and keeps converged
#[async_trait]
pub trait ManagedResource: Resource + Clone + Send + Sync + Sized {
    /// Kind reported in logs and store errors
    const KIND: ResourceKind;

    /// Digest of this object's desired content
    fn fingerprint(&self) -> String;

    /// Reads the stored object at `key`
    async fn fetch(store: &dyn ClusterStore, key: &ObjectKey) -> Result<Self, StoreError>;
    /// Creates `object`; fails with AlreadyExists if it is present
    async fn create(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError>;
    /// Replaces `object` at its resourceVersion
    async fn replace(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError>;
}

#[async_trait]
impl ManagedResource for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn fingerprint(&self) -> String {
        service_fingerprint(self)
    }

    async fn fetch(store: &dyn ClusterStore, key: &ObjectKey) -> Result<Self, StoreError> {
        store.get_service(key).await
    }

    async fn create(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError> {
        store.create_service(object).await
    }

    async fn replace(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError> {
        store.replace_service(object).await
    }
}

#[async_trait]
impl ManagedResource for StatefulSet {
    const KIND: ResourceKind = ResourceKind::StatefulSet;

    fn fingerprint(&self) -> String {
        stateful_set_fingerprint(self)
    }

    async fn fetch(store: &dyn ClusterStore, key: &ObjectKey) -> Result<Self, StoreError> {
        store.get_stateful_set(key).await
    }

    async fn create(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError> {
        store.create_stateful_set(object).await
    }

    async fn replace(store: &dyn ClusterStore, object: &Self) -> Result<Self, StoreError> {
        store.replace_stateful_set(object).await
    }
}

/// What a single converge call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convergence {
    /// The object was missing and has been created
    Created,
    /// The object had drifted and has been replaced
    Updated,
    /// The stored object already matched, or a concurrent create won
    Unchanged,
}

impl Convergence {
    /// Whether this call wrote to the store
    pub fn wrote(self) -> bool {
        self != Self::Unchanged
    }
}

/// Stamps the object's own fingerprint onto it.
pub fn stamp_fingerprint<R: ManagedResource>(mut object: R) -> R {
    let fingerprint = object.fingerprint();
    add_hash_annotation(object.meta_mut(), fingerprint);
    object
}

/// Runs a store get under `timeout`.
///
/// NotFound is mapped to `Ok(None)`. A timeout or any other store error is
/// returned as an error; nothing is swallowed.
pub async fn get_with_timeout<T, F>(
    operation: &str,
    timeout: Duration,
    get: F,
) -> Result<Option<T>, ControllerError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, get).await {
        Ok(Ok(object)) => Ok(Some(object)),
        Ok(Err(e)) if e.is_not_found() => Ok(None),
        Ok(Err(e)) => Err(ControllerError::Store(e)),
        Err(_) => Err(ControllerError::Timeout {
            operation: operation.to_string(),
            after: timeout,
        }),
    }
}

/// Fails when `meta` names a controlling owner other than `owner_uid`.
fn check_controller<R: ManagedResource>(
    meta: &ObjectMeta,
    owner_uid: &str,
) -> Result<(), ControllerError> {
    let foreign = meta
        .owner_references
        .iter()
        .flatten()
        .find(|r| r.controller == Some(true) && r.uid != owner_uid);
    match foreign {
        Some(existing) => Err(ControllerError::Ownership(format!(
            "{} {} is controlled by {} {}",
            R::KIND,
            meta.name.as_deref().unwrap_or_default(),
            existing.kind,
            existing.name
        ))),
        None => Ok(()),
    }
}

/// Points `object` at the cluster as its controlling owner.
///
/// Refuses to take over an object another controller already owns.
fn set_owner<R: ManagedResource>(
    object: &mut R,
    owner: OwnerReference,
) -> Result<(), ControllerError> {
    check_controller::<R>(object.meta(), &owner.uid)?;
    let refs = object.meta_mut().owner_references.get_or_insert_with(Vec::new);
    refs.retain(|r| r.uid != owner.uid);
    refs.push(owner);
    Ok(())
}

/// Creates `desired` after attaching the owner reference.
///
/// If the owner reference cannot be built nothing is written. A create that
/// loses a race with another writer (AlreadyExists) counts as found.
pub async fn create_owned<R: ManagedResource>(
    ctx: &ReconcileContext,
    store: &dyn ClusterStore,
    mut desired: R,
) -> Result<Convergence, ControllerError> {
    let owner = ctx.owner_reference()?;
    set_owner(&mut desired, owner)?;
    let name = desired.meta().name.clone().unwrap_or_default();

    match R::create(store, &desired).await {
        Ok(_) => {
            info!("Created {} {}/{}", R::KIND, ctx.namespace, name);
            Ok(Convergence::Created)
        }
        Err(e) if e.is_already_exists() => {
            debug!(
                "{} {}/{} was created concurrently, treating as found",
                R::KIND,
                ctx.namespace,
                name
            );
            Ok(Convergence::Unchanged)
        }
        Err(e) => Err(ControllerError::Store(e)),
    }
}

/// Replaces `observed` with `desired`.
///
/// The write carries the observed resourceVersion, so a concurrent change
/// makes it fail with a conflict instead of being overwritten.
pub async fn replace_on_drift<R: ManagedResource>(
    ctx: &ReconcileContext,
    store: &dyn ClusterStore,
    observed: &R,
    mut desired: R,
) -> Result<Convergence, ControllerError> {
    let owner = ctx.owner_reference()?;
    desired.meta_mut().owner_references = observed.meta().owner_references.clone();
    set_owner(&mut desired, owner)?;
    desired.meta_mut().resource_version = observed.meta().resource_version.clone();
    let name = desired.meta().name.clone().unwrap_or_default();

    R::replace(store, &desired).await.map_err(|e| {
        warn!("Failed to replace drifted {} {}/{}: {}", R::KIND, ctx.namespace, name, e);
        ControllerError::Store(e)
    })?;
    info!("Replaced drifted {} {}/{}", R::KIND, ctx.namespace, name);
    Ok(Convergence::Updated)
}

/// Get-or-create for one desired object, replacing it when its fingerprint
/// no longer matches the stored one.
///
/// An object controlled by someone else is refused whether or not its
/// fingerprint matches.
pub async fn converge<R: ManagedResource>(
    ctx: &ReconcileContext,
    store: &dyn ClusterStore,
    timeout: Duration,
    desired: R,
) -> Result<Convergence, ControllerError> {
    let name = desired.meta().name.clone().unwrap_or_default();
    let key = ctx.key(&name);

    let operation = format!("get {} {}", R::KIND, key);
    let observed = get_with_timeout(&operation, timeout, R::fetch(store, &key)).await?;
    match observed {
        None => create_owned(ctx, store, desired).await,
        Some(observed) if resources_have_same_hash(observed.meta(), desired.meta()) => {
            let owner = ctx.owner_reference()?;
            check_controller::<R>(observed.meta(), &owner.uid)?;
            debug!("{} {} is up to date", R::KIND, key);
            Ok(Convergence::Unchanged)
        }
        Some(observed) => {
            debug!("{} {} fingerprint differs from desired state", R::KIND, key);
            replace_on_drift(ctx, store, &observed, desired).await
        }
    }
}

