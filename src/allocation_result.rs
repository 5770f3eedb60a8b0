//! Result of placing one phase, with diagnostics of the chosen connections.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    connection::{destinations, ConnectionSet},
    context::PhaseContext,
    error::Result,
    task::Nid,
};

/// Connections chosen for a phase and metrics computed for them. Diagnostics never influence the choice.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AllocationResult {
    /// Chosen connections.
    pub connections: ConnectionSet,
    /// Number of fitness evaluations divided by the configured population size, zero for non-search heuristics.
    pub search_effort: f64,
    /// `exp(-sum of failure rates)` over destinations.
    pub reliability: f64,
    /// Sum of ETX distances between source and destination of every connection.
    pub contention: f64,
    /// Standard deviation of `duration + 1` over reached destinations.
    pub duration_balance: f64,
    /// Standard deviation of failure rates over destinations.
    pub failure_rate_balance: f64,
    /// Number of destinations divided by the number of nodes in the current snapshot.
    pub cluster_utilization: f64,
}

impl AllocationResult {
    /// Computes diagnostics for `connections`. Fails if a destination has unusable failure history.
    pub fn synthesize(
        strategy: &str,
        ctx: &PhaseContext,
        connections: ConnectionSet,
        search_effort: f64,
    ) -> Result<Self> {
        let snapshot = ctx.snapshot();
        let dst_nids = destinations(&connections);

        let mut reliability = 0.0;
        let mut duration_balance = 0.0;
        let mut failure_rate_balance = 0.0;
        if !dst_nids.is_empty() {
            let failure_rates = dst_nids
                .iter()
                .map(|&nid| ctx.failure_rate(nid))
                .collect::<Result<Vec<_>>>()?;
            reliability = (-failure_rates.iter().sum::<f64>()).exp();
            failure_rate_balance = std_dev(&failure_rates);

            let outcome = ctx.replay(strategy, &connections);
            let durations = outcome.durations.values().map(|duration| duration + 1.0).collect::<Vec<_>>();
            duration_balance = std_dev(&durations);
        }

        let etx = snapshot.etx_weighted_graph();
        let contention = connections
            .iter()
            .filter_map(|connection| {
                ctx.tasks
                    .get(&connection.tid)
                    .map(|task| etx.distance(task.nid, connection.nid))
            })
            .sum::<f64>();

        let node_count = snapshot.node_count();
        let cluster_utilization = if node_count == 0 {
            0.0
        } else {
            dst_nids.len() as f64 / node_count as f64
        };

        Ok(AllocationResult {
            connections,
            search_effort,
            reliability,
            contention,
            duration_balance,
            failure_rate_balance,
            cluster_utilization,
        })
    }

    /// Distinct destination nodes.
    pub fn destinations(&self) -> BTreeSet<Nid> {
        destinations(&self.connections)
    }
}

/// Population standard deviation, zero for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n).sqrt()
}
