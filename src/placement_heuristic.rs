//! Common interface of all placement heuristics.

use std::collections::BTreeMap;

use log::info;
use rand_pcg::Pcg64;

use crate::{
    allocation_result::AllocationResult,
    connection::{ConnectionSet, SourceNodes},
    context::PhaseContext,
    error::Result,
    profile::JobProfile,
    task::{Nid, Task, TaskIdGenerator, Tid},
    topology::Snapshot,
};

pub trait PlacementHeuristic: Send + Sync {
    /// Name used in logs and passed to the replay simulator.
    fn name(&self) -> &str;

    /// Chooses nodes for the first phase and creates one task per node with an equal share of the job input.
    ///
    /// Nodes are picked uniformly at random unless a heuristic knows better.
    fn allocate_data(
        &self,
        job: &JobProfile,
        snapshot: &dyn Snapshot,
        tids: &TaskIdGenerator,
        rng: &mut Pcg64,
    ) -> BTreeMap<Tid, Task> {
        let nids = snapshot.random_node_ids(initial_node_count(job, snapshot), rng);
        split_input(job, &nids, tids)
    }

    /// Places the tasks of the next phase.
    fn allocate_tasks(&self, ctx: &PhaseContext) -> Result<AllocationResult> {
        let sources = SourceNodes::from_tasks(&ctx.tasks)?;
        let (connections, search_effort) = self.choose_connections(ctx, &sources)?;
        info!(
            "{}: trace {} phase {} ({}) -> {} connections, search effort {:.2}",
            self.name(),
            ctx.trace_id,
            ctx.phase.index,
            ctx.phase.comm_type,
            connections.len(),
            search_effort
        );
        AllocationResult::synthesize(self.name(), ctx, connections, search_effort)
    }

    /// Returns chosen connections and the search effort spent on them.
    fn choose_connections(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<(ConnectionSet, f64)>;
}

/// Number of nodes receiving the initial input.
pub fn initial_node_count(job: &JobProfile, snapshot: &dyn Snapshot) -> usize {
    let node_count = snapshot.node_count();
    ((job.cluster_utilization * node_count as f64).round() as usize).clamp(node_count.min(1), node_count)
}

/// Creates one task per node, splitting the job input equally.
pub fn split_input(job: &JobProfile, nids: &[Nid], tids: &TaskIdGenerator) -> BTreeMap<Tid, Task> {
    if nids.is_empty() {
        return BTreeMap::new();
    }
    let share = job.input_size / nids.len() as f64;
    nids.iter()
        .map(|&nid| {
            let tid = tids.next_tid();
            (tid, Task::new(tid, nid, share))
        })
        .collect()
}
