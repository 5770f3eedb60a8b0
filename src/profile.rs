//! Job and phase profiles.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::PlacementError;

/// How the output of one phase travels to the tasks of the next phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum CommType {
    /// Data of every source reaches one destination among the chosen set.
    Replicate,
    /// Every source sends a part of its data to every chosen destination.
    Shuffle,
}

impl FromStr for CommType {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Replicate" | "REPLICATE" => Ok(CommType::Replicate),
            "Shuffle" | "SHUFFLE" => Ok(CommType::Shuffle),
            x => Err(PlacementError::UnknownCommType(x.to_string())),
        }
    }
}

impl TryFrom<String> for CommType {
    type Error = PlacementError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for CommType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommType::Replicate => write!(f, "REPLICATE"),
            CommType::Shuffle => write!(f, "SHUFFLE"),
        }
    }
}

/// Which side of a job the locality-aware heuristic keeps close to the data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum JobWeighting {
    /// Keep replicate (map-like) phases on data-local nodes.
    FavorMap,
    /// Keep shuffle (reduce-like) phases on data-local nodes.
    FavorReduce,
    /// Place both kinds of phases on a cohesive k-club community.
    FavorBoth,
}

impl FromStr for JobWeighting {
    type Err = PlacementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FavorMap" => Ok(JobWeighting::FavorMap),
            "FavorReduce" => Ok(JobWeighting::FavorReduce),
            "FavorBoth" => Ok(JobWeighting::FavorBoth),
            x => Err(PlacementError::UnknownJobWeighting(x.to_string())),
        }
    }
}

impl TryFrom<String> for JobWeighting {
    type Error = PlacementError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Description of one phase of a job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhaseProfile {
    /// Position of the phase in the job.
    #[serde(default)]
    pub index: usize,
    /// Communication discipline between this phase and the next one.
    pub comm_type: CommType,
    /// Ratio of the output size to the input size of the phase.
    #[serde(default = "default_output_ratio")]
    pub output_ratio: f64,
}

fn default_output_ratio() -> f64 {
    1.0
}

/// Description of a data-parallel job.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobProfile {
    /// Name of the job, used in logs only.
    pub name: String,
    /// Total input size of the first phase.
    pub input_size: f64,
    /// Fraction of nodes which receive the initial input.
    pub cluster_utilization: f64,
    /// Locality preference used by the locality-aware heuristic.
    pub weighting: JobWeighting,
    /// Phases in execution order.
    pub phases: Vec<PhaseProfile>,
}

impl JobProfile {
    /// Returns phase by index.
    pub fn phase(&self, index: usize) -> Option<&PhaseProfile> {
        self.phases.get(index)
    }
}
