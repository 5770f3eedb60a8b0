//! Tools for loading traces, failure histories, jobs and configs from YAML files.

use std::path::Path;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    config::HeuristicConfig,
    error::{PlacementError, Result},
    history::FailureRateTable,
    profile::{JobProfile, PhaseProfile},
    static_trace::{Link, StaticSnapshot, StaticTrace},
    task::Nid,
};

/// Reads any YAML file into `T`.
pub fn read_yaml<T: DeserializeOwned, P: AsRef<Path>>(file: P) -> Result<T> {
    let path = file.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| PlacementError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| PlacementError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Struct representing a [StaticSnapshot].
#[derive(Serialize, Deserialize)]
pub struct YamlSnapshot {
    /// Time relative to the trace start.
    pub time: f64,
    /// Original ids of the nodes, zero-based ids are positions in this list.
    pub nodes: Vec<Nid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
}

/// YAML representation of a [StaticTrace].
#[derive(Serialize, Deserialize)]
pub struct YamlTrace {
    pub init_timestamp: f64,
    pub snapshots: Vec<YamlSnapshot>,
}

impl StaticTrace {
    pub fn from_yaml_trace(yaml: YamlTrace) -> Result<Self> {
        let snapshots = yaml
            .snapshots
            .into_iter()
            .map(|snapshot| StaticSnapshot::new(snapshot.time, snapshot.nodes, &snapshot.links))
            .collect::<Result<Vec<_>>>()?;
        StaticTrace::new(yaml.init_timestamp, snapshots)
    }

    /// Reads [StaticTrace] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        Self::from_yaml_trace(read_yaml(file)?)
    }
}

/// One failure rate sample.
#[derive(Serialize, Deserialize)]
pub struct YamlFailureSample {
    pub timestamp: f64,
    pub rate: f64,
}

/// Failure history of one node.
#[derive(Serialize, Deserialize)]
pub struct YamlNodeHistory {
    /// Original node id.
    pub nid: Nid,
    pub samples: Vec<YamlFailureSample>,
}

impl FailureRateTable {
    /// Reads [FailureRateTable] from YAML file with a list of [YamlNodeHistory].
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        let nodes: Vec<YamlNodeHistory> = read_yaml(file)?;
        let mut table = FailureRateTable::new();
        for node in nodes.into_iter() {
            for sample in node.samples.into_iter() {
                table.insert(node.nid, sample.timestamp, sample.rate);
            }
        }
        Ok(table)
    }
}

/// Struct representing a [PhaseProfile], names are parsed with their `FromStr` implementations.
#[derive(Serialize, Deserialize)]
pub struct YamlPhase {
    pub comm_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_ratio: Option<f64>,
}

/// YAML representation of a [JobProfile].
#[derive(Serialize, Deserialize)]
pub struct YamlJob {
    pub name: String,
    pub input_size: f64,
    pub cluster_utilization: f64,
    pub weighting: String,
    pub phases: Vec<YamlPhase>,
}

impl JobProfile {
    /// Builds [JobProfile] from its YAML representation. Phase indices are assigned by position.
    pub fn from_yaml_job(yaml: YamlJob) -> Result<Self> {
        let phases = yaml
            .phases
            .into_iter()
            .enumerate()
            .map(|(index, phase)| {
                Ok(PhaseProfile {
                    index,
                    comm_type: phase.comm_type.parse()?,
                    output_ratio: phase.output_ratio.unwrap_or(1.0),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(JobProfile {
            name: yaml.name,
            input_size: yaml.input_size,
            cluster_utilization: yaml.cluster_utilization,
            weighting: yaml.weighting.parse()?,
            phases,
        })
    }

    /// Reads [JobProfile] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        Self::from_yaml_job(read_yaml(file)?)
    }
}

impl HeuristicConfig {
    /// Reads and validates [HeuristicConfig] from YAML file.
    pub fn from_yaml<P: AsRef<Path>>(file: P) -> Result<Self> {
        let config: HeuristicConfig = read_yaml(file)?;
        config.validate()?;
        Ok(config)
    }
}
