//! Simple replay model estimating communication durations from hop counts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{
    profile::CommType,
    task::Tid,
    topology::{ReplayOutcome, ReplayRequest, ReplaySimulator},
};

/// Every hop of a transfer costs `hop_latency + bytes / bandwidth`, a destination receives its transfers one after
/// another.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HopReplaySimulator {
    pub bandwidth: f64,
    #[serde(default)]
    pub hop_latency: f64,
}

impl HopReplaySimulator {
    pub fn new(bandwidth: f64, hop_latency: f64) -> Self {
        Self { bandwidth, hop_latency }
    }
}

impl ReplaySimulator for HopReplaySimulator {
    fn replay(&self, request: ReplayRequest<'_>) -> ReplayOutcome {
        let snapshot = request.trace.closest_snapshot(request.sim_time_offset);
        let mut fan_out: BTreeMap<Tid, usize> = BTreeMap::new();
        for connection in request.connections.iter() {
            *fan_out.entry(connection.tid).or_default() += 1;
        }

        let mut durations = BTreeMap::new();
        let mut reached = BTreeSet::new();
        for connection in request.connections.iter() {
            let Some(task) = request.tasks.get(&connection.tid) else {
                continue;
            };
            let hops = snapshot.distance(task.nid, connection.nid);
            if !hops.is_finite() {
                continue;
            }
            let parts = match request.phase.comm_type {
                CommType::Replicate => 1,
                CommType::Shuffle => fan_out[&connection.tid],
            };
            let bytes = task.input_size * request.phase.output_ratio / parts as f64;
            *durations.entry(connection.nid).or_insert(0.0) += hops * (self.hop_latency + bytes / self.bandwidth);
            reached.insert(connection.tid);
        }

        ReplayOutcome {
            succeeded: !request.tasks.is_empty() && request.tasks.keys().all(|tid| reached.contains(tid)),
            durations,
        }
    }
}
