//! Time to first phase success (TPS), the cost minimized by the search heuristics.

use crate::{
    connection::{ConnectionSet, CostAndConn, INFEASIBLE_COST},
    context::PhaseContext,
    error::Result,
};

/// Expected time until the phase first succeeds under an exponential failure model.
/// * `ld` --- aggregated failure load, sum of `failure_rate * (duration + 1)` over destinations.
/// * `d_s` --- mean communication delay, average of `duration + 1` over destinations.
pub fn time_to_phase_success(ld: f64, d_s: f64) -> f64 {
    if ld == 0.0 {
        // the failure term vanishes, its closed form is 0 * inf here
        return d_s;
    }
    let l_p = ld / d_s;
    let r_p = (-ld).exp();
    let r_p_inv = ld.exp();
    let d_f = -(d_s + 1.0 / l_p) * r_p + 1.0 / l_p;
    d_s + (r_p_inv - 1.0) * d_f
}

/// TPS over `(failure_rate, duration)` observations of reached destinations, [INFEASIBLE_COST] if there are none.
pub fn tps_from_observations(observations: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let mut ld = 0.0;
    let mut sum_d = 0.0;
    let mut n = 0usize;
    for (failure_rate, duration) in observations {
        ld += failure_rate * (duration + 1.0);
        sum_d += duration + 1.0;
        n += 1;
    }
    if n == 0 {
        return INFEASIBLE_COST;
    }
    time_to_phase_success(ld, sum_d / n as f64)
}

/// Scores connection sets of one phase.
pub struct TpsEvaluator<'a> {
    ctx: &'a PhaseContext,
    strategy: &'a str,
}

impl<'a> TpsEvaluator<'a> {
    pub fn new(ctx: &'a PhaseContext, strategy: &'a str) -> Self {
        Self { ctx, strategy }
    }

    /// Replays the phase with `connections` and turns the observed durations into a cost.
    ///
    /// Fails only when the failure rate of a reached destination is unusable.
    pub fn evaluate(&self, connections: ConnectionSet) -> Result<CostAndConn> {
        let outcome = self.ctx.replay(self.strategy, &connections);
        if !outcome.succeeded {
            return Ok(CostAndConn::infeasible(connections));
        }
        let mut observations = Vec::with_capacity(outcome.durations.len());
        for (&nid, &duration) in outcome.durations.iter() {
            observations.push((self.ctx.failure_rate(nid)?, duration));
        }
        let cost = tps_from_observations(observations);
        if cost.is_nan() {
            log::warn!("TPS of a candidate is NaN, treating it as infeasible");
            return Ok(CostAndConn::infeasible(connections));
        }
        CostAndConn::new(cost, connections)
    }
}
