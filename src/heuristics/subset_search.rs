use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use log::{debug, warn};

use crate::{
    connection::{ConnectionSet, CostAndConn, SourceNodes},
    context::PhaseContext,
    error::Result,
    genetic::{GeneticConfig, GeneticSearch},
    heuristics::common::{cluster_size, phase_rng},
    matching::MatchPolicy,
    objective::TpsEvaluator,
    placement_heuristic::PlacementHeuristic,
    task::Nid,
};

/// Outcome of one subset search with a fixed subset size.
#[derive(Clone, Debug)]
pub struct SubsetSearchRun {
    /// Subset size.
    pub k: usize,
    /// Best candidate found.
    pub best: CostAndConn,
    /// Number of generations bred after the initial population.
    pub generations: usize,
    /// Number of fitness evaluations.
    pub evaluations: usize,
    /// `evaluations / population_size`.
    pub search_effort: f64,
}

/// Genetic search for the best destination subset of a fixed size (MTA-S).
pub struct SubsetSearchHeuristic {
    max_cluster_utilization: f64,
    genetic: GeneticConfig,
}

impl SubsetSearchHeuristic {
    pub fn new(max_cluster_utilization: f64, genetic: GeneticConfig) -> Self {
        Self {
            max_cluster_utilization,
            genetic,
        }
    }

    /// Searches destination subsets of size `k` among all nodes of the current snapshot.
    pub fn search(
        &self,
        strategy: &str,
        ctx: &PhaseContext,
        sources: &SourceNodes,
        k: usize,
    ) -> Result<SubsetSearchRun> {
        let snapshot = ctx.snapshot();
        let universe = snapshot.node_ids();
        let evaluations = Arc::new(AtomicUsize::new(0));

        let fitness = {
            let ctx = Arc::new(ctx.clone());
            let sources = Arc::new(sources.clone());
            let snapshot = snapshot.clone();
            let evaluations = evaluations.clone();
            let strategy = strategy.to_string();
            move |subset: &[Nid]| -> Result<CostAndConn> {
                let matching = MatchPolicy::for_search(ctx.phase.comm_type).match_nodes(
                    snapshot.as_ref(),
                    &sources.nids,
                    &sources.nid2tid,
                    subset,
                    &mut phase_rng(&ctx),
                );
                let result = TpsEvaluator::new(&ctx, &strategy).evaluate(matching.connections);
                evaluations.fetch_add(1, Ordering::SeqCst);
                result
            }
        };

        let outcome = GeneticSearch::new(self.genetic.clone(), universe, k, ctx.seed, fitness).run()?;
        let evaluations = evaluations.load(Ordering::SeqCst);
        debug!(
            "{}: k = {}, best cost {} after {} generations and {} evaluations",
            strategy,
            k,
            outcome.best.cost(),
            outcome.generations,
            evaluations
        );
        Ok(SubsetSearchRun {
            k,
            best: outcome.best,
            generations: outcome.generations,
            evaluations,
            search_effort: evaluations as f64 / self.genetic.population_size as f64,
        })
    }
}

impl PlacementHeuristic for SubsetSearchHeuristic {
    fn name(&self) -> &str {
        "MTA-S"
    }

    fn choose_connections(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<(ConnectionSet, f64)> {
        let k = cluster_size(ctx, self.max_cluster_utilization);
        let run = self.search(self.name(), ctx, sources, k)?;
        if run.best.is_infeasible() {
            warn!("{}: no feasible assignment for phase {}", self.name(), ctx.phase.index);
        }
        Ok((run.best.into_connections(), run.search_effort))
    }
}
