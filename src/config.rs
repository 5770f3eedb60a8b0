//! Tunables of the heuristics.

use serde::{Deserialize, Serialize};

use crate::{
    error::{PlacementError, Result},
    genetic::GeneticConfig,
    heuristics::bisection_search::BisectionBracket,
};

/// Configuration shared by all heuristics.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Fraction of the initial node count used as destination subset size.
    pub max_cluster_utilization: f64,
    /// Parameters of the subset search.
    pub genetic: GeneticConfig,
    /// Initial bracket of the bisection over the subset size.
    pub bisection: BisectionBracket,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            max_cluster_utilization: 0.5,
            genetic: GeneticConfig::default(),
            bisection: BisectionBracket::default(),
        }
    }
}

impl HeuristicConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_cluster_utilization > 0.0 && self.max_cluster_utilization <= 1.0) {
            return Err(PlacementError::InvalidConfig(format!(
                "max cluster utilization {} is outside of (0, 1]",
                self.max_cluster_utilization
            )));
        }
        self.genetic.validate()?;
        self.bisection.validate()
    }
}
