//! Algorithms which turn a set of destination nodes into concrete connections.
//!
//! Every matcher except [shuffle] first connects each source node which is also a destination to itself. Remaining
//! (remote) sources take destinations from a pool which is refilled with the whole destination set once it runs
//! dry, so every destination is used once per refill cycle.

use std::collections::BTreeMap;

use itertools::Itertools;
use rand::Rng;
use rand_pcg::Pcg64;

use crate::{
    connection::{Connection, ConnectionSet},
    profile::CommType,
    task::{Nid, Tid},
    topology::DistanceOracle,
};

/// Connections produced by a matcher together with the total distance they cover.
#[derive(Clone, Debug, Default)]
pub struct Matching {
    pub connections: ConnectionSet,
    /// Sum of oracle distances over all remote pairs, local pairs count as zero.
    pub distance: f64,
}

/// Available matchers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchPolicy {
    GreedyClosest,
    BestClosest,
    Random,
    Shuffle,
}

impl MatchPolicy {
    /// Matcher used by the subset search for a communication type.
    pub fn for_search(comm_type: CommType) -> Self {
        match comm_type {
            CommType::Replicate => MatchPolicy::BestClosest,
            CommType::Shuffle => MatchPolicy::Shuffle,
        }
    }

    pub fn match_nodes<O: DistanceOracle + ?Sized>(
        self,
        oracle: &O,
        src_nids: &[Nid],
        src_nid2tid: &BTreeMap<Nid, Tid>,
        dst_nids: &[Nid],
        rng: &mut Pcg64,
    ) -> Matching {
        match self {
            MatchPolicy::GreedyClosest => greedy_closest(oracle, src_nids, src_nid2tid, dst_nids),
            MatchPolicy::BestClosest => best_closest(oracle, src_nids, src_nid2tid, dst_nids),
            MatchPolicy::Random => random(oracle, src_nids, src_nid2tid, dst_nids, rng),
            MatchPolicy::Shuffle => shuffle(oracle, src_nids, src_nid2tid, dst_nids),
        }
    }
}

struct LocalPass {
    connections: ConnectionSet,
    remote: Vec<Nid>,
    pool: Vec<Nid>,
}

fn local_pass(src_nids: &[Nid], src_nid2tid: &BTreeMap<Nid, Tid>, dst_nids: &[Nid]) -> LocalPass {
    let mut connections = ConnectionSet::new();
    let mut remote = Vec::new();
    let mut pool = dst_nids.to_vec();
    for &src in src_nids.iter().filter(|src| src_nid2tid.contains_key(src)) {
        match pool.iter().position(|&dst| dst == src) {
            Some(pos) => {
                pool.remove(pos);
                connections.insert(Connection::new(src_nid2tid[&src], src));
            }
            None => remote.push(src),
        }
    }
    LocalPass {
        connections,
        remote,
        pool,
    }
}

/// Matches `remote` sources in the given order, each to the nearest node left in the pool.
fn greedy_run<'a, O: DistanceOracle + ?Sized>(
    oracle: &O,
    remote: impl Iterator<Item = &'a Nid>,
    initial_pool: &[Nid],
    dst_nids: &[Nid],
) -> (Vec<(Nid, Nid)>, f64) {
    let mut pool = initial_pool.to_vec();
    let mut pairs = Vec::new();
    let mut total = 0.0;
    for &src in remote {
        if pool.is_empty() {
            pool = dst_nids.to_vec();
        }
        let distances = pool.iter().map(|&dst| oracle.distance(src, dst)).collect::<Vec<_>>();
        let Some(pos) = distances.iter().position_min_by(|a, b| a.total_cmp(b)) else {
            continue;
        };
        total += distances[pos];
        pairs.push((src, pool.remove(pos)));
    }
    (pairs, total)
}

fn finish(
    mut connections: ConnectionSet,
    pairs: Vec<(Nid, Nid)>,
    distance: f64,
    src_nid2tid: &BTreeMap<Nid, Tid>,
) -> Matching {
    connections.extend(
        pairs
            .into_iter()
            .map(|(src, dst)| Connection::new(src_nid2tid[&src], dst)),
    );
    Matching { connections, distance }
}

/// Local pass, then every remote source in input order takes the nearest available destination.
pub fn greedy_closest<O: DistanceOracle + ?Sized>(
    oracle: &O,
    src_nids: &[Nid],
    src_nid2tid: &BTreeMap<Nid, Tid>,
    dst_nids: &[Nid],
) -> Matching {
    if dst_nids.is_empty() {
        return Matching::default();
    }
    let local = local_pass(src_nids, src_nid2tid, dst_nids);
    let (pairs, distance) = greedy_run(oracle, local.remote.iter(), &local.pool, dst_nids);
    finish(local.connections, pairs, distance, src_nid2tid)
}

/// Runs the greedy matching once per rotation of the remote sources and keeps the cheapest one.
///
/// Ties keep the earliest rotation, so rotation 0 (plain greedy) wins unless another one is strictly better.
pub fn best_closest<O: DistanceOracle + ?Sized>(
    oracle: &O,
    src_nids: &[Nid],
    src_nid2tid: &BTreeMap<Nid, Tid>,
    dst_nids: &[Nid],
) -> Matching {
    if dst_nids.is_empty() {
        return Matching::default();
    }
    let local = local_pass(src_nids, src_nid2tid, dst_nids);
    let n = local.remote.len();
    let mut best: Option<(Vec<(Nid, Nid)>, f64)> = None;
    for shift in 0..n.max(1) {
        let order = local.remote[shift..].iter().chain(local.remote[..shift].iter());
        let (pairs, distance) = greedy_run(oracle, order, &local.pool, dst_nids);
        if best.as_ref().map_or(true, |(_, best_distance)| distance < *best_distance) {
            best = Some((pairs, distance));
        }
    }
    let (pairs, distance) = best.unwrap_or_default();
    finish(local.connections, pairs, distance, src_nid2tid)
}

/// Local pass, then every remote source takes a uniformly random destination from the pool.
pub fn random<O: DistanceOracle + ?Sized>(
    oracle: &O,
    src_nids: &[Nid],
    src_nid2tid: &BTreeMap<Nid, Tid>,
    dst_nids: &[Nid],
    rng: &mut Pcg64,
) -> Matching {
    if dst_nids.is_empty() {
        return Matching::default();
    }
    let local = local_pass(src_nids, src_nid2tid, dst_nids);
    let mut pool = local.pool;
    let mut pairs = Vec::new();
    let mut distance = 0.0;
    for &src in local.remote.iter() {
        if pool.is_empty() {
            pool = dst_nids.to_vec();
        }
        let dst = pool.remove(rng.gen_range(0..pool.len()));
        distance += oracle.distance(src, dst);
        pairs.push((src, dst));
    }
    finish(local.connections, pairs, distance, src_nid2tid)
}

/// Every source task connects to every destination.
pub fn shuffle<O: DistanceOracle + ?Sized>(
    oracle: &O,
    src_nids: &[Nid],
    src_nid2tid: &BTreeMap<Nid, Tid>,
    dst_nids: &[Nid],
) -> Matching {
    let mut result = Matching::default();
    for ((src, tid), dst) in src_nids
        .iter()
        .filter_map(|src| src_nid2tid.get(src).map(|&tid| (*src, tid)))
        .cartesian_product(dst_nids.iter().copied())
    {
        if src != dst {
            result.distance += oracle.distance(src, dst);
        }
        result.connections.insert(Connection::new(tid, dst));
    }
    result
}
