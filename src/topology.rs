//! Interfaces of the collaborators the placement engine consumes.
//!
//! Topology snapshots, failure rate history and trace replay are produced outside of this crate. The engine only
//! reads them through the traits below; [static_trace](crate::static_trace), [history](crate::history) and
//! [replay](crate::replay) contain simple implementations.

use std::{collections::BTreeMap, sync::Arc};

use rand_pcg::Pcg64;

use crate::{
    connection::ConnectionSet,
    profile::PhaseProfile,
    task::{Nid, NidRemap, Task, Tid},
};

/// Pairwise cost between nodes of one snapshot.
pub trait DistanceOracle: Send + Sync {
    /// Distance between two nodes, [f64::INFINITY] if one can't reach the other.
    fn distance(&self, a: Nid, b: Nid) -> f64;
}

/// Topology of the network at one moment.
pub trait Snapshot: DistanceOracle {
    /// Number of nodes in the snapshot.
    fn node_count(&self) -> usize;

    /// All node ids in the snapshot's native order.
    fn node_ids(&self) -> Vec<Nid>;

    /// `k` distinct nodes chosen uniformly at random.
    fn random_node_ids(&self, k: usize, rng: &mut Pcg64) -> Vec<Nid>;

    /// `k` nodes preferring the ones which already hold data of `sources`.
    fn data_local_node_ids(&self, sources: &[Nid], k: usize) -> Vec<Nid>;

    /// `k` nodes forming a cohesive community.
    fn k_club_node_ids(&self, k: usize) -> Vec<Nid>;

    /// Distance oracle weighted by expected transmission count.
    fn etx_weighted_graph(&self) -> &dyn DistanceOracle;

    /// Mapping from zero-based node ids of this snapshot to original node ids.
    fn nid_remap(&self) -> NidRemap;
}

/// Time-varying topology of one trace.
pub trait Trace: Send + Sync {
    /// Absolute timestamp of the beginning of the trace.
    fn init_timestamp(&self) -> f64;

    /// Snapshot taken exactly at `simulated_time` (relative to the trace start), if any.
    fn snapshot_at(&self, simulated_time: f64) -> Option<Arc<dyn Snapshot>>;

    /// Snapshot which describes the topology at `simulated_time` best.
    fn closest_snapshot(&self, simulated_time: f64) -> Arc<dyn Snapshot>;
}

/// History of node failures.
pub trait HistoryStat: Send + Sync {
    /// Failure rate of a node at absolute `timestamp`. NaN means the history is unusable.
    fn failure_rate(&self, original_nid: Nid, timestamp: f64) -> f64;
}

/// Everything the replay simulator needs to replay one candidate.
pub struct ReplayRequest<'a> {
    /// Name of the heuristic asking for the replay.
    pub strategy: &'a str,
    pub trace_id: usize,
    pub trace: &'a dyn Trace,
    pub sim_time_offset: f64,
    pub phase: &'a PhaseProfile,
    pub next_phase: &'a PhaseProfile,
    /// Independent copy of the source tasks, the simulator may modify it freely.
    pub tasks: BTreeMap<Tid, Task>,
    pub connections: &'a ConnectionSet,
}

/// Result of one replay.
#[derive(Clone, Debug, Default)]
pub struct ReplayOutcome {
    /// Whether the replay itself succeeded.
    pub succeeded: bool,
    /// Communication duration of every destination reached during the replay.
    pub durations: BTreeMap<Nid, f64>,
}

/// Replays a trace with a tentative connection set.
pub trait ReplaySimulator: Send + Sync {
    fn replay(&self, request: ReplayRequest<'_>) -> ReplayOutcome;
}
