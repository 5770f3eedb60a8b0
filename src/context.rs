//! Everything a heuristic knows about the phase it places.

use std::{collections::BTreeMap, sync::Arc};

use crate::{
    connection::ConnectionSet,
    error::{PlacementError, Result},
    profile::{JobProfile, PhaseProfile},
    task::{Nid, NidRemap, Task, Tid},
    topology::{HistoryStat, ReplayOutcome, ReplayRequest, ReplaySimulator, Snapshot, Trace},
};

/// Context of one `allocate_tasks` call.
///
/// Built fresh for every phase and shared read-only with the fitness evaluations of a search.
#[derive(Clone)]
pub struct PhaseContext {
    pub trace_id: usize,
    pub job: JobProfile,
    pub phase: PhaseProfile,
    pub next_phase: PhaseProfile,
    pub trace: Arc<dyn Trace>,
    /// Simulated time of the phase relative to the trace start.
    pub sim_time_offset: f64,
    /// Tasks of the current phase.
    pub tasks: BTreeMap<Tid, Task>,
    pub history: Arc<dyn HistoryStat>,
    pub replay: Arc<dyn ReplaySimulator>,
    pub nid_remap: NidRemap,
    /// Seed for everything random inside the phase.
    pub seed: u64,
}

impl PhaseContext {
    /// Absolute timestamp of the phase.
    pub fn timestamp(&self) -> f64 {
        self.trace.init_timestamp() + self.sim_time_offset
    }

    /// Topology at the phase start.
    pub fn snapshot(&self) -> Arc<dyn Snapshot> {
        self.trace.closest_snapshot(self.sim_time_offset)
    }

    /// Topology at the trace start.
    pub fn initial_snapshot(&self) -> Arc<dyn Snapshot> {
        self.trace.closest_snapshot(0.0)
    }

    pub fn original_nid(&self, nid: Nid) -> Nid {
        self.nid_remap.get(&nid).copied().unwrap_or(nid)
    }

    /// Failure rate of a zero-based node at the phase timestamp.
    pub fn failure_rate(&self, nid: Nid) -> Result<f64> {
        let original = self.original_nid(nid);
        let timestamp = self.timestamp();
        let rate = self.history.failure_rate(original, timestamp);
        if rate.is_nan() {
            return Err(PlacementError::NanFailureRate {
                nid: original,
                timestamp,
            });
        }
        Ok(rate)
    }

    /// Replays the phase with `connections` on a copy of the tasks.
    pub fn replay(&self, strategy: &str, connections: &ConnectionSet) -> ReplayOutcome {
        self.replay.replay(ReplayRequest {
            strategy,
            trace_id: self.trace_id,
            trace: self.trace.as_ref(),
            sim_time_offset: self.sim_time_offset,
            phase: &self.phase,
            next_phase: &self.next_phase,
            tasks: self.tasks.clone(),
            connections,
        })
    }
}
