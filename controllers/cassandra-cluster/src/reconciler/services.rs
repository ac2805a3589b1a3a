//! Headless services step

use super::{ReconcileContext, ReconcileResult, Reconciler};
use super::constructor::{new_all_pods_service, new_seed_service};
use crate::reconcile_helpers::converge;
use tracing::debug;

impl Reconciler {
    /// Ensures the seed and all-pods headless services exist and match the
    /// desired state. Both are always checked; the first failure stops the
    /// step.
    pub async fn check_headless_services(&self, ctx: &ReconcileContext) -> ReconcileResult {
        let desired = [new_seed_service(&ctx.cluster), new_all_pods_service(&ctx.cluster)];

        for service in desired {
            let converged = converge(ctx, self.store.as_ref(), self.request_timeout, service).await;
            if let Err(e) = converged {
                return ReconcileResult::error(e);
            }
        }

        debug!(
            "Headless services for CassandraCluster {}/{} are in place",
            ctx.namespace, ctx.cluster.spec.name
        );
        ReconcileResult::continue_()
    }
}
