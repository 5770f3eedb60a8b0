//! Trace made of fixed topology snapshots.

use std::{cmp::Reverse, collections::VecDeque, sync::Arc};

use itertools::Itertools;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::{
    error::{PlacementError, Result},
    task::{Nid, NidRemap},
    topology::{DistanceOracle, Snapshot, Trace},
};

/// Nodes within this many hops of each other form a club.
const CLUB_RADIUS: f64 = 2.0;

/// Bidirectional radio link between two zero-based nodes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    pub from: Nid,
    pub to: Nid,
    /// Expected transmission count of the link.
    #[serde(default = "default_etx")]
    pub etx: f64,
}

fn default_etx() -> f64 {
    1.0
}

/// All-pairs shortest paths over ETX weights.
pub struct EtxGraph {
    distances: Vec<Vec<f64>>,
}

impl DistanceOracle for EtxGraph {
    fn distance(&self, a: Nid, b: Nid) -> f64 {
        self.distances
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

/// Topology at one moment. Node `i` of the snapshot is `original_nids[i]` in the stable numbering.
pub struct StaticSnapshot {
    time: f64,
    original_nids: Vec<Nid>,
    hops: Vec<Vec<f64>>,
    etx: EtxGraph,
}

impl StaticSnapshot {
    pub fn new(time: f64, original_nids: Vec<Nid>, links: &[Link]) -> Result<Self> {
        let n = original_nids.len();
        let mut adjacency = vec![Vec::new(); n];
        let mut etx = vec![vec![f64::INFINITY; n]; n];
        for (i, row) in etx.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for link in links.iter() {
            if link.from >= n || link.to >= n {
                return Err(PlacementError::InvalidConfig(format!(
                    "link {} - {} at time {} refers to a missing node",
                    link.from, link.to, time
                )));
            }
            if !(link.etx >= 1.0) {
                return Err(PlacementError::InvalidConfig(format!(
                    "ETX of link {} - {} must be at least 1, got {}",
                    link.from, link.to, link.etx
                )));
            }
            adjacency[link.from].push(link.to);
            adjacency[link.to].push(link.from);
            etx[link.from][link.to] = etx[link.from][link.to].min(link.etx);
            etx[link.to][link.from] = etx[link.to][link.from].min(link.etx);
        }

        for k in 0..n {
            for i in 0..n {
                for j in 0..n {
                    let through = etx[i][k] + etx[k][j];
                    if through < etx[i][j] {
                        etx[i][j] = through;
                    }
                }
            }
        }

        let hops = (0..n).map(|start| bfs(&adjacency, start)).collect();

        Ok(Self {
            time,
            original_nids,
            hops,
            etx: EtxGraph { distances: etx },
        })
    }

    /// Time of the snapshot relative to the trace start.
    pub fn time(&self) -> f64 {
        self.time
    }

    fn nearest_to(&self, sources: &[Nid], candidate: Nid) -> f64 {
        sources
            .iter()
            .map(|&src| self.distance(src, candidate))
            .min_by(|a, b| a.total_cmp(b))
            .unwrap_or(f64::INFINITY)
    }
}

fn bfs(adjacency: &[Vec<Nid>], start: Nid) -> Vec<f64> {
    let mut dist = vec![f64::INFINITY; adjacency.len()];
    let mut queue = VecDeque::from([start]);
    dist[start] = 0.0;
    while let Some(v) = queue.pop_front() {
        for &u in adjacency[v].iter() {
            if dist[u].is_infinite() {
                dist[u] = dist[v] + 1.0;
                queue.push_back(u);
            }
        }
    }
    dist
}

impl DistanceOracle for StaticSnapshot {
    /// Number of hops between the nodes.
    fn distance(&self, a: Nid, b: Nid) -> f64 {
        self.hops
            .get(a)
            .and_then(|row| row.get(b))
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

impl Snapshot for StaticSnapshot {
    fn node_count(&self) -> usize {
        self.original_nids.len()
    }

    fn node_ids(&self) -> Vec<Nid> {
        (0..self.node_count()).collect()
    }

    fn random_node_ids(&self, k: usize, rng: &mut Pcg64) -> Vec<Nid> {
        let n = self.node_count();
        rand::seq::index::sample(rng, n, k.min(n)).into_vec()
    }

    fn data_local_node_ids(&self, sources: &[Nid], k: usize) -> Vec<Nid> {
        let n = self.node_count();
        let mut result = sources.iter().copied().filter(|&src| src < n).unique().collect::<Vec<_>>();
        result.truncate(k);
        let rest = (0..n)
            .filter(|nid| !result.contains(nid))
            .map(|nid| (self.nearest_to(sources, nid), nid))
            .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
            .map(|(_, nid)| nid)
            .take(k.saturating_sub(result.len()))
            .collect::<Vec<_>>();
        result.extend(rest);
        result
    }

    /// The node with the most neighbours within [CLUB_RADIUS] hops, then nodes by hop distance from it.
    fn k_club_node_ids(&self, k: usize) -> Vec<Nid> {
        let n = self.node_count();
        let Some(center) = (0..n).max_by_key(|&v| {
            (
                self.hops[v].iter().filter(|&&hops| hops <= CLUB_RADIUS).count(),
                Reverse(v),
            )
        }) else {
            return Vec::new();
        };
        (0..n)
            .sorted_by(|&a, &b| self.hops[center][a].total_cmp(&self.hops[center][b]).then(a.cmp(&b)))
            .take(k)
            .collect()
    }

    fn etx_weighted_graph(&self) -> &dyn DistanceOracle {
        &self.etx
    }

    fn nid_remap(&self) -> NidRemap {
        self.original_nids.iter().copied().enumerate().collect()
    }
}

/// Trace which jumps from one snapshot to the next.
pub struct StaticTrace {
    init_timestamp: f64,
    snapshots: Vec<Arc<StaticSnapshot>>,
}

impl StaticTrace {
    /// Creates new trace. Snapshots are sorted by time, at least one is required.
    pub fn new(init_timestamp: f64, mut snapshots: Vec<StaticSnapshot>) -> Result<Self> {
        if snapshots.is_empty() {
            return Err(PlacementError::InvalidConfig("trace has no snapshots".to_string()));
        }
        snapshots.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(Self {
            init_timestamp,
            snapshots: snapshots.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn snapshots(&self) -> &[Arc<StaticSnapshot>] {
        &self.snapshots
    }
}

impl Trace for StaticTrace {
    fn init_timestamp(&self) -> f64 {
        self.init_timestamp
    }

    fn snapshot_at(&self, simulated_time: f64) -> Option<Arc<dyn Snapshot>> {
        self.snapshots
            .iter()
            .find(|snapshot| snapshot.time == simulated_time)
            .map(|snapshot| snapshot.clone() as Arc<dyn Snapshot>)
    }

    /// Latest snapshot not after `simulated_time`, or the first one.
    fn closest_snapshot(&self, simulated_time: f64) -> Arc<dyn Snapshot> {
        let after = self.snapshots.partition_point(|snapshot| snapshot.time <= simulated_time);
        self.snapshots[after.saturating_sub(1)].clone()
    }
}
