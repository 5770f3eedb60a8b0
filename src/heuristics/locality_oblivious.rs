use crate::{
    connection::{ConnectionSet, SourceNodes},
    context::PhaseContext,
    error::Result,
    heuristics::common::{cluster_size, phase_rng},
    matching::{greedy_closest, shuffle},
    placement_heuristic::PlacementHeuristic,
    profile::CommType,
};

/// Baseline: replicate phases stay on the nodes holding the data, shuffle phases go to random nodes.
pub struct LocalityObliviousHeuristic {
    max_cluster_utilization: f64,
}

impl LocalityObliviousHeuristic {
    pub fn new(max_cluster_utilization: f64) -> Self {
        Self {
            max_cluster_utilization,
        }
    }
}

impl PlacementHeuristic for LocalityObliviousHeuristic {
    fn name(&self) -> &str {
        "LocalityOblivious"
    }

    fn choose_connections(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<(ConnectionSet, f64)> {
        let snapshot = ctx.snapshot();
        let matching = match ctx.phase.comm_type {
            CommType::Replicate => {
                let dst_nids = snapshot.data_local_node_ids(&sources.nids, sources.nids.len());
                greedy_closest(snapshot.as_ref(), &sources.nids, &sources.nid2tid, &dst_nids)
            }
            CommType::Shuffle => {
                let k = cluster_size(ctx, self.max_cluster_utilization);
                let dst_nids = snapshot.random_node_ids(k, &mut phase_rng(ctx));
                shuffle(snapshot.as_ref(), &sources.nids, &sources.nid2tid, &dst_nids)
            }
        };
        Ok((matching.connections, 0.0))
    }
}
