//! Per-rack StatefulSets step

use super::constructor::new_stateful_set;
use super::{ReconcileContext, ReconcileResult, Reconciler};
use crate::reconcile_helpers::converge;
use tracing::{debug, info};

impl Reconciler {
    /// Ensures one StatefulSet per datacenter rack, sized by the
    /// datacenter's `nodesPerRack`.
    ///
    /// A cluster without datacenters has nothing to run; the step finishes
    /// without writing.
    pub async fn check_stateful_sets(&self, ctx: &ReconcileContext) -> ReconcileResult {
        let mut written = 0usize;

        for datacenter in &ctx.cluster.spec.datacenters {
            for rack in &datacenter.racks {
                let desired = match new_stateful_set(
                    &ctx.cluster,
                    &datacenter.name,
                    &rack.name,
                    datacenter.nodes_per_rack,
                ) {
                    Ok(desired) => desired,
                    Err(e) => return ReconcileResult::error(e),
                };

                match converge(ctx, self.store.as_ref(), self.request_timeout, desired).await {
                    Ok(outcome) if outcome.wrote() => written += 1,
                    Ok(_) => {}
                    Err(e) => return ReconcileResult::error(e),
                }
            }
        }

        if written > 0 {
            info!(
                "Wrote {} StatefulSet(s) for CassandraCluster {}/{}",
                written, ctx.namespace, ctx.cluster.spec.name
            );
        } else {
            debug!(
                "StatefulSets for CassandraCluster {}/{} are up to date",
                ctx.namespace, ctx.cluster.spec.name
            );
        }
        ReconcileResult::done()
    }
}
