use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    connection::{ConnectionSet, CostAndConn, SourceNodes},
    context::PhaseContext,
    error::{PlacementError, Result},
    genetic::GeneticConfig,
    heuristics::subset_search::{SubsetSearchHeuristic, SubsetSearchRun},
    placement_heuristic::PlacementHeuristic,
};

/// Initial range of subset sizes as fractions of the current node count.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BisectionBracket {
    pub low: f64,
    pub high: f64,
}

impl Default for BisectionBracket {
    fn default() -> Self {
        Self { low: 0.6, high: 0.8 }
    }
}

impl BisectionBracket {
    pub fn validate(&self) -> Result<()> {
        if !(0.0 <= self.low && self.low <= self.high && self.high <= 1.0) {
            return Err(PlacementError::InvalidConfig(format!(
                "bisection bracket [{}, {}] is not inside [0, 1]",
                self.low, self.high
            )));
        }
        Ok(())
    }

    /// Subset sizes for `node_count` nodes, never below one.
    pub fn range(&self, node_count: usize) -> (usize, usize) {
        let low = ((self.low * node_count as f64) as usize).max(1);
        let high = ((self.high * node_count as f64) as usize).min(node_count).max(low);
        (low, high)
    }
}

/// One iteration of the bisection.
#[derive(Clone, Debug)]
pub struct BisectionStep {
    /// Bracket the iteration started with.
    pub low: usize,
    pub high: usize,
    /// Search at `(3 * low + high) / 4`.
    pub left: SubsetSearchRun,
    /// Search at `(low + 3 * high) / 4`.
    pub right: SubsetSearchRun,
}

/// Result of a bisection.
#[derive(Clone, Debug)]
pub struct BisectionOutcome {
    /// Best candidate over all iterations.
    pub best: CostAndConn,
    pub search_effort: f64,
    pub steps: Vec<BisectionStep>,
}

/// Bisection over the subset size, running the subset search at two interior points per step (MTA-D).
pub struct BisectionSearchHeuristic {
    search: SubsetSearchHeuristic,
    bracket: BisectionBracket,
}

impl BisectionSearchHeuristic {
    pub fn new(genetic: GeneticConfig, bracket: BisectionBracket) -> Self {
        Self {
            search: SubsetSearchHeuristic::new(1.0, genetic),
            bracket,
        }
    }

    /// Runs the bisection. The effort reported is the one of the last subset search.
    pub fn bisect(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<BisectionOutcome> {
        self.bracket.validate()?;
        let mut outcome = BisectionOutcome {
            best: CostAndConn::infeasible(ConnectionSet::new()),
            search_effort: 0.0,
            steps: Vec::new(),
        };
        let node_count = ctx.snapshot().node_count();
        if node_count == 0 {
            return Ok(outcome);
        }

        let (mut low, mut high) = self.bracket.range(node_count);
        while low <= high {
            let k_left = (3 * low + high) / 4;
            let k_mid = (low + high) / 2;
            let k_right = (low + 3 * high) / 4;

            let left = self.search.search(self.name(), ctx, sources, k_left)?;
            let right = if k_right == k_left {
                left.clone()
            } else {
                self.search.search(self.name(), ctx, sources, k_right)?
            };
            outcome.search_effort = right.search_effort;
            debug!(
                "{}: bracket [{}, {}], k = {} costs {}, k = {} costs {}",
                self.name(),
                low,
                high,
                k_left,
                left.best.cost(),
                k_right,
                right.best.cost()
            );

            let left_wins = left.best <= right.best;
            let winner = if left_wins { &left.best } else { &right.best };
            if *winner < outcome.best {
                outcome.best = winner.clone();
            }
            outcome.steps.push(BisectionStep { low, high, left, right });
            if left_wins {
                if k_mid == 0 {
                    break;
                }
                high = k_mid - 1;
            } else {
                low = k_mid + 1;
            }
            if outcome.best.is_infeasible() {
                break;
            }
        }
        Ok(outcome)
    }
}

impl PlacementHeuristic for BisectionSearchHeuristic {
    fn name(&self) -> &str {
        "MTA-D"
    }

    fn choose_connections(&self, ctx: &PhaseContext, sources: &SourceNodes) -> Result<(ConnectionSet, f64)> {
        let BisectionOutcome { best, search_effort, .. } = self.bisect(ctx, sources)?;
        if best.is_infeasible() {
            warn!("{}: no feasible assignment for phase {}", self.name(), ctx.phase.index);
        }
        Ok((best.into_connections(), search_effort))
    }
}
