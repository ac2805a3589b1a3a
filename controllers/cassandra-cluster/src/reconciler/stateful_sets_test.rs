//! Unit tests for the per-rack StatefulSets step

#[cfg(test)]
mod tests {
    use crate::reconciler::ReconcileResult;
    use crate::reconciler::constructor::new_stateful_set;
    use crate::test_utils::*;
    use cluster_store::{MockClusterStore, MockFailure, MockOperation, ResourceKind};

    #[tokio::test]
    async fn test_one_stateful_set_per_rack() {
        let store = MockClusterStore::new();
        let ctx = context_for(create_test_cluster(
            "demo",
            vec![datacenter("east", 3, &["r1", "r2"]), datacenter("west", 2, &["r1"])],
        ));

        let result = reconciler(&store).check_stateful_sets(&ctx).await;
        assert!(matches!(result, ReconcileResult::Done));
        assert_eq!(store.stateful_set_count(), 3);

        let expected = [("demo-east-r1-sts", 3), ("demo-east-r2-sts", 3), ("demo-west-r1-sts", 2)];
        for (name, replicas) in expected {
            let sts = store.stateful_set(&key(name)).unwrap();
            assert_eq!(sts.spec.unwrap().replicas, Some(replicas));
        }
    }

    #[tokio::test]
    async fn test_no_datacenters_is_done_without_writes() {
        let store = MockClusterStore::new();
        let ctx = context_for(create_test_cluster("demo", vec![]));

        let result = reconciler(&store).check_stateful_sets(&ctx).await;
        assert!(matches!(result, ReconcileResult::Done));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_up_to_date_stateful_set_is_untouched() {
        let store = MockClusterStore::new();
        let ctx = context_for(demo_cluster());
        store.add_stateful_set(new_stateful_set(&ctx.cluster, "dc1", "rack1", 3).unwrap());

        let result = reconciler(&store).check_stateful_sets(&ctx).await;
        assert!(matches!(result, ReconcileResult::Done));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_first_failing_rack_stops_the_step() {
        let store = MockClusterStore::new();
        store.fail_on(
            MockOperation::Get,
            ResourceKind::StatefulSet,
            "demo-dc1-rack1-sts",
            MockFailure::Unavailable,
        );
        let cluster = create_test_cluster("demo", vec![datacenter("dc1", 3, &["rack1", "rack2"])]);
        let ctx = context_for(cluster);

        let result = reconciler(&store).check_stateful_sets(&ctx).await;
        assert!(matches!(result, ReconcileResult::Error(_)));
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn test_cluster_without_uid_writes_nothing() {
        let store = MockClusterStore::new();
        let mut ctx = context_for(demo_cluster());
        ctx.cluster.metadata.uid = None;

        let result = reconciler(&store).check_stateful_sets(&ctx).await;
        assert!(matches!(
            result,
            ReconcileResult::Error(crate::error::ControllerError::Ownership(_))
        ));
        assert!(store.writes().is_empty());
    }
}
