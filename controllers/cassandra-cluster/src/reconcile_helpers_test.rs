//! Unit tests for reconcile_helpers module

#[cfg(test)]
mod tests {
    use crate::error::ControllerError;
    use crate::reconcile_helpers::*;
    use crate::reconciler::constructor::{new_all_pods_service, new_seed_service};
    use crate::reconciler::fingerprint::RESOURCE_HASH_ANNOTATION;
    use crate::test_utils::*;
    use cluster_store::{
        ClusterStore, MockClusterStore, MockFailure, MockOperation, ResourceKind, StoreError,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
    use std::time::Duration;

    fn foreign_controller() -> OwnerReference {
        OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            name: "someone-else".to_string(),
            uid: "uid-foreign".to_string(),
            controller: Some(true),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_with_timeout_maps_not_found_to_none() {
        let store = MockClusterStore::new();
        let missing_key = key("missing");
        let get = store.get_service(&missing_key);
        let found = get_with_timeout("get service", TEST_TIMEOUT, get).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_get_with_timeout_reports_hang_as_timeout() {
        let store = MockClusterStore::new();
        store.hang_on_get(ResourceKind::Service, "slow");
        let slow_key = key("slow");
        let get = store.get_service(&slow_key);
        let err = get_with_timeout("get service", Duration::from_millis(10), get)
            .await
            .unwrap_err();
        match err {
            ControllerError::Timeout { operation, after } => {
                assert_eq!(operation, "get service");
                assert_eq!(after, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_get_with_timeout_propagates_other_errors() {
        let store = MockClusterStore::new();
        store.fail_on(MockOperation::Get, ResourceKind::Service, "svc", MockFailure::Conflict);
        let err = get_with_timeout("get service", TEST_TIMEOUT, store.get_service(&key("svc")))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Store(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_create_owned_fails_closed_without_uid() {
        let store = MockClusterStore::new();
        let mut ctx = context_for(demo_cluster());
        ctx.cluster.metadata.uid = None;

        let err = create_owned(&ctx, &store, new_seed_service(&ctx.cluster)).await.unwrap_err();
        assert!(matches!(err, ControllerError::Ownership(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_create_owned_sets_controller_reference() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());

        let outcome = create_owned(&ctx, &store, new_seed_service(&ctx.cluster)).await.unwrap();
        assert_eq!(outcome, Convergence::Created);

        let stored = store.service(&key("demo-seed-service")).unwrap();
        let owners = stored.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].uid, "uid-demo");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_create_owned_treats_already_exists_as_found() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        store.add_service(new_seed_service(&ctx.cluster));

        let outcome = create_owned(&ctx, &store, new_seed_service(&ctx.cluster)).await.unwrap();
        assert_eq!(outcome, Convergence::Unchanged);
    }

    #[tokio::test]
    async fn test_converge_leaves_matching_object_alone() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        store.add_service(new_all_pods_service(&ctx.cluster));

        let desired = new_all_pods_service(&ctx.cluster);
        let outcome = converge(&ctx, &store, TEST_TIMEOUT, desired).await.unwrap();
        assert_eq!(outcome, Convergence::Unchanged);
        assert!(!outcome.wrote());
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_converge_replaces_drifted_object_at_observed_version() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        let mut drifted = new_all_pods_service(&ctx.cluster);
        drifted
            .metadata
            .annotations
            .as_mut()
            .unwrap()
            .insert(RESOURCE_HASH_ANNOTATION.to_string(), "stale".to_string());
        store.add_service(drifted);
        let observed_version = store
            .service(&key("demo-all-pods-service"))
            .unwrap()
            .metadata
            .resource_version;

        let desired = new_all_pods_service(&ctx.cluster);
        let outcome = converge(&ctx, &store, TEST_TIMEOUT, desired).await.unwrap();
        assert_eq!(outcome, Convergence::Updated);

        let stored = store.service(&key("demo-all-pods-service")).unwrap();
        assert_ne!(stored.metadata.resource_version, observed_version);
        assert_eq!(
            stored.metadata.annotations,
            new_all_pods_service(&ctx.cluster).metadata.annotations
        );
        assert!(stored.metadata.owner_references.is_some());
    }

    #[tokio::test]
    async fn test_converge_refuses_object_owned_by_another_controller() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        let mut foreign = new_all_pods_service(&ctx.cluster);
        foreign.metadata.annotations = None;
        foreign.metadata.owner_references = Some(vec![foreign_controller()]);
        store.add_service(foreign);

        let desired = new_all_pods_service(&ctx.cluster);
        let err = converge(&ctx, &store, TEST_TIMEOUT, desired).await.unwrap_err();
        assert!(matches!(err, ControllerError::Ownership(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_converge_refuses_matching_object_owned_by_another_controller() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        let mut foreign = new_all_pods_service(&ctx.cluster);
        foreign.metadata.owner_references = Some(vec![foreign_controller()]);
        store.add_service(foreign);

        let desired = new_all_pods_service(&ctx.cluster);
        let err = converge(&ctx, &store, TEST_TIMEOUT, desired).await.unwrap_err();
        match err {
            ControllerError::Ownership(message) => assert!(message.contains("someone-else")),
            other => panic!("expected ownership error, got {other}"),
        }
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_converge_accepts_matching_object_it_already_controls() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        let mut owned = new_all_pods_service(&ctx.cluster);
        owned.metadata.owner_references = Some(vec![ctx.owner_reference().unwrap()]);
        store.add_service(owned);

        let desired = new_all_pods_service(&ctx.cluster);
        let outcome = converge(&ctx, &store, TEST_TIMEOUT, desired).await.unwrap();
        assert_eq!(outcome, Convergence::Unchanged);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_stamp_fingerprint_is_idempotent() {
        let ctx = context_for(demo_cluster());
        let once = new_seed_service(&ctx.cluster);
        let twice = stamp_fingerprint(once.clone());
        assert_eq!(once, twice);
    }
}
