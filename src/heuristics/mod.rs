//! Implementations of placement heuristics and a resolver which builds them by name.

pub mod bisection_search;
pub mod common;
pub mod locality_aware;
pub mod locality_oblivious;
pub mod subset_search;

use std::{collections::BTreeMap, str::FromStr};

use crate::{
    config::HeuristicConfig,
    error::{PlacementError, Result},
    placement_heuristic::PlacementHeuristic,
};

use self::{
    bisection_search::BisectionSearchHeuristic, locality_aware::LocalityAwareHeuristic,
    locality_oblivious::LocalityObliviousHeuristic, subset_search::SubsetSearchHeuristic,
};

/// Known heuristics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeuristicKind {
    LocalityOblivious,
    LocalityAware,
    SubsetSearch,
    BisectionSearch,
}

impl FromStr for HeuristicKind {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LocalityOblivious" => Ok(HeuristicKind::LocalityOblivious),
            "LocalityAware" => Ok(HeuristicKind::LocalityAware),
            "MTA-S" | "SubsetSearch" => Ok(HeuristicKind::SubsetSearch),
            "MTA-D" | "BisectionSearch" => Ok(HeuristicKind::BisectionSearch),
            x => Err(PlacementError::UnknownHeuristic(x.to_string())),
        }
    }
}

/// Splits `Name[key=value,...]` into the name and its arguments.
pub fn read_name(name: &str) -> Result<(&str, BTreeMap<&str, &str>)> {
    let Some(open) = name.find('[') else {
        return Ok((name, BTreeMap::new()));
    };
    let Some(body) = name[open + 1..].strip_suffix(']') else {
        return Err(PlacementError::InvalidConfig(format!("unterminated arguments in {}", name)));
    };
    let mut args = BTreeMap::new();
    for arg in body.split(',').filter(|arg| !arg.is_empty()) {
        let Some((key, value)) = arg.split_once('=') else {
            return Err(PlacementError::InvalidConfig(format!("argument {} of {} is not key=value", arg, name)));
        };
        args.insert(key.trim(), value.trim());
    }
    Ok((&name[..open], args))
}

fn parse_arg<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| PlacementError::InvalidConfig(format!("can't parse {} = {}", key, value)))
}

/// Applies arguments of a heuristic name on top of `config`.
fn override_config(config: &HeuristicConfig, args: &BTreeMap<&str, &str>) -> Result<HeuristicConfig> {
    let mut config = config.clone();
    for (&key, &value) in args.iter() {
        match key {
            "max_cluster_utilization" => config.max_cluster_utilization = parse_arg(key, value)?,
            "population_size" => config.genetic.population_size = parse_arg(key, value)?,
            "max_generations" => config.genetic.max_generations = parse_arg(key, value)?,
            "steady_generations" => config.genetic.steady_generations = parse_arg(key, value)?,
            "mutation_probability" => config.genetic.mutation_probability = parse_arg(key, value)?,
            "threads" => config.genetic.threads = parse_arg(key, value)?,
            "bracket_low" => config.bisection.low = parse_arg(key, value)?,
            "bracket_high" => config.bisection.high = parse_arg(key, value)?,
            x => return Err(PlacementError::InvalidConfig(format!("unknown heuristic argument {}", x))),
        }
    }
    config.validate()?;
    Ok(config)
}

/// Builds a heuristic from its name, e.g. `MTA-S[population_size=30]`.
pub fn resolve_heuristic(name: &str, config: &HeuristicConfig) -> Result<Box<dyn PlacementHeuristic>> {
    let (name, args) = read_name(name)?;
    let kind: HeuristicKind = name.parse()?;
    let config = override_config(config, &args)?;
    Ok(match kind {
        HeuristicKind::LocalityOblivious => Box::new(LocalityObliviousHeuristic::new(config.max_cluster_utilization)),
        HeuristicKind::LocalityAware => Box::new(LocalityAwareHeuristic::new(config.max_cluster_utilization)),
        HeuristicKind::SubsetSearch => Box::new(SubsetSearchHeuristic::new(
            config.max_cluster_utilization,
            config.genetic,
        )),
        HeuristicKind::BisectionSearch => Box::new(BisectionSearchHeuristic::new(config.genetic, config.bisection)),
    })
}
