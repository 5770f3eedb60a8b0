use std::collections::BTreeMap;

use rand_pcg::Pcg64;

use crate::{
    connection::{ConnectionSet, SourceNodes},
    context::PhaseContext,
    error::Result,
    heuristics::common::{cluster_size, phase_rng},
    matching::{greedy_closest, shuffle},
    placement_heuristic::{initial_node_count, split_input, PlacementHeuristic},
    profile::{CommType, JobProfile, JobWeighting},
    task::{Nid, Task, TaskIdGenerator, Tid},
    topology::Snapshot,
};

/// Picks destinations according to the job weighting.
///
/// | weighting     | replicate phase        | shuffle phase          |
/// |---------------|------------------------|------------------------|
/// | `FavorMap`    | data-local nodes       | random nodes           |
/// | `FavorReduce` | random nodes           | data-local nodes       |
/// | `FavorBoth`   | k-club community       | k-club community       |
pub struct LocalityAwareHeuristic {
    max_cluster_utilization: f64,
}

impl LocalityAwareHeuristic {
    pub fn new(max_cluster_utilization: f64) -> Self {
        Self {
            max_cluster_utilization,
        }
    }

    fn destinations(&self, ctx: &PhaseContext, sources: &SourceNodes, snapshot: &dyn Snapshot) -> Vec<Nid> {
        let comm_type = ctx.phase.comm_type;
        let data_local = matches!(
            (ctx.job.weighting, comm_type),
            (JobWeighting::FavorMap, CommType::Replicate) | (JobWeighting::FavorReduce, CommType::Shuffle)
        );
        let k = match comm_type {
            CommType::Replicate => sources.nids.len().min(snapshot.node_count()),
            CommType::Shuffle => cluster_size(ctx, self.max_cluster_utilization),
        };
        if ctx.job.weighting == JobWeighting::FavorBoth {
            snapshot.k_club_node_ids(k)
        } else if data_local {
            snapshot.data_local_node_ids(&sources.nids, k)
        } else {
            snapshot.random_node_ids(k, &mut phase_rng(ctx))
        }
    }
}

impl PlacementHeuristic for LocalityAwareHeuristic {
    fn name(&self) -> &str {
        "LocalityAware"
    }

    fn allocate_data(
        &self,
        job: &JobProfile,
        snapshot: &dyn Snapshot,
        tids: &TaskIdGenerator,
        rng: &mut Pcg64,
    ) -> BTreeMap<Tid, Task> {
        let count = initial_node_count(job, snapshot);
        let nids = match job.weighting {
            JobWeighting::FavorBoth => snapshot.k_club_node_ids(count),
            JobWeighting::FavorMap | JobWeighting::FavorReduce => snapshot.random_node_ids(count, rng),
        };
        split_input(job, &nids, tids)
    }

    fn choose_connections(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<(ConnectionSet, f64)> {
        let snapshot = ctx.snapshot();
        let dst_nids = self.destinations(ctx, sources, snapshot.as_ref());
        let matching = match ctx.phase.comm_type {
            CommType::Replicate => greedy_closest(snapshot.as_ref(), &sources.nids, &sources.nid2tid, &dst_nids),
            CommType::Shuffle => shuffle(snapshot.as_ref(), &sources.nids, &sources.nid2tid, &dst_nids),
        };
        Ok((matching.connections, 0.0))
    }
}
