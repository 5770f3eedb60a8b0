#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use manet_mr::{
    connection::destinations,
    context::PhaseContext,
    history::FailureRateTable,
    profile::{CommType, JobProfile, JobWeighting, PhaseProfile},
    static_trace::{Link, StaticSnapshot, StaticTrace},
    task::{Nid, Task, Tid},
    topology::{DistanceOracle, HistoryStat, ReplayOutcome, ReplayRequest, ReplaySimulator, Trace},
};

pub const INIT_TIMESTAMP: f64 = 1000.0;

/// Original ids of snapshot nodes are shifted by this value.
pub const ORIGINAL_NID_SHIFT: Nid = 100;

/// Nodes placed on a line, distance is the difference of positions.
pub struct LineOracle {
    pub positions: Vec<f64>,
}

impl LineOracle {
    pub fn evenly_spaced(n: usize) -> Self {
        Self {
            positions: (0..n).map(|i| i as f64).collect(),
        }
    }
}

impl DistanceOracle for LineOracle {
    fn distance(&self, a: Nid, b: Nid) -> f64 {
        (self.positions[a] - self.positions[b]).abs()
    }
}

/// Replay which reaches every destination after the same duration.
pub struct FixedReplay {
    pub succeeded: bool,
    pub duration: f64,
}

impl ReplaySimulator for FixedReplay {
    fn replay(&self, request: ReplayRequest<'_>) -> ReplayOutcome {
        ReplayOutcome {
            succeeded: self.succeeded,
            durations: destinations(request.connections)
                .into_iter()
                .map(|nid| (nid, self.duration))
                .collect(),
        }
    }
}

/// Replay which succeeds but never reaches a destination.
pub struct SilentReplay;

impl ReplaySimulator for SilentReplay {
    fn replay(&self, _request: ReplayRequest<'_>) -> ReplayOutcome {
        ReplayOutcome {
            succeeded: true,
            durations: BTreeMap::new(),
        }
    }
}

/// Replay which succeeds without reaching a destination and counts how often it was asked.
#[derive(Default)]
pub struct CountingReplay {
    calls: AtomicUsize,
}

impl CountingReplay {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReplaySimulator for CountingReplay {
    fn replay(&self, _request: ReplayRequest<'_>) -> ReplayOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ReplayOutcome {
            succeeded: true,
            durations: BTreeMap::new(),
        }
    }
}

pub fn chain_links(n: usize) -> Vec<Link> {
    (1..n)
        .map(|i| Link {
            from: i - 1,
            to: i,
            etx: 1.0,
        })
        .collect()
}

/// Trace with one snapshot where nodes form a chain `0 - 1 - ... - n-1`.
pub fn chain_trace(n: usize) -> Arc<StaticTrace> {
    let original_nids = (0..n).map(|i| i + ORIGINAL_NID_SHIFT).collect();
    let snapshot = StaticSnapshot::new(0.0, original_nids, &chain_links(n)).unwrap();
    Arc::new(StaticTrace::new(INIT_TIMESTAMP, vec![snapshot]).unwrap())
}

/// Every node of an `n`-node snapshot fails with the same rate.
pub fn uniform_history(n: usize, rate: f64) -> Arc<FailureRateTable> {
    Arc::new(FailureRateTable::constant(
        (0..n).map(|i| (i + ORIGINAL_NID_SHIFT, rate)),
    ))
}

/// One task per node, task ids are positions in `nids`.
pub fn tasks_on(nids: &[Nid], input_size: f64) -> BTreeMap<Tid, Task> {
    nids.iter()
        .enumerate()
        .map(|(i, &nid)| (i as Tid, Task::new(i as Tid, nid, input_size)))
        .collect()
}

pub fn job(weighting: JobWeighting, comm_types: &[CommType]) -> JobProfile {
    JobProfile {
        name: "test".to_string(),
        input_size: 120.0,
        cluster_utilization: 0.5,
        weighting,
        phases: comm_types
            .iter()
            .enumerate()
            .map(|(index, &comm_type)| PhaseProfile {
                index,
                comm_type,
                output_ratio: 1.0,
            })
            .collect(),
    }
}

pub fn context(
    trace: Arc<StaticTrace>,
    job: &JobProfile,
    phase: usize,
    tasks: BTreeMap<Tid, Task>,
    history: Arc<dyn HistoryStat>,
    replay: Arc<dyn ReplaySimulator>,
) -> PhaseContext {
    let nid_remap = trace.closest_snapshot(0.0).nid_remap();
    PhaseContext {
        trace_id: 0,
        job: job.clone(),
        phase: job.phases[phase].clone(),
        next_phase: job.phases.get(phase + 1).unwrap_or(&job.phases[phase]).clone(),
        trace,
        sim_time_offset: 0.0,
        tasks,
        history,
        replay,
        nid_remap,
        seed: 42,
    }
}
