use rand::SeedableRng;
use rand_pcg::Pcg64;

use crate::context::PhaseContext;

/// Number of destinations for a phase: `utilization` of the initial node count, bounded by the current one.
pub fn cluster_size(ctx: &PhaseContext, utilization: f64) -> usize {
    let initial = ctx.initial_snapshot().node_count();
    let current = ctx.snapshot().node_count();
    ((utilization * initial as f64).round() as usize).min(current)
}

pub fn phase_rng(ctx: &PhaseContext) -> Pcg64 {
    Pcg64::seed_from_u64(ctx.seed)
}
