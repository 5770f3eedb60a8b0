//! Errors of the placement engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::task::Nid;

/// Everything that can abort an allocation.
///
/// Infeasible candidates are not errors, they are ranked with the
/// [infeasible cost](crate::connection::INFEASIBLE_COST).
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("unknown communication type {0}")]
    UnknownCommType(String),

    #[error("unknown job weighting {0}")]
    UnknownJobWeighting(String),

    #[error("unknown heuristic {0}")]
    UnknownHeuristic(String),

    /// Failure rate history is unusable for a node that has to be scored.
    #[error("failure rate of node {nid} at {timestamp} is NaN")]
    NanFailureRate { nid: Nid, timestamp: f64 },

    #[error("cost must be a non-negative number, got {0}")]
    InvalidCost(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("can't read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("can't parse YAML from file {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("fitness evaluation worker did not report a result")]
    WorkerLost,
}

pub type Result<T> = std::result::Result<T, PlacementError>;
