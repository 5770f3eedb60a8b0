//! Connections between source tasks and destination nodes, and scored candidates.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
};

use serde::{Deserialize, Serialize};

use crate::{
    error::{PlacementError, Result},
    task::{Nid, Task, Tid},
};

/// Cost of a candidate for which no assignment was found.
pub const INFEASIBLE_COST: f64 = f64::MAX;

/// Source task sends its output to a destination node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Connection {
    pub tid: Tid,
    pub nid: Nid,
}

impl Connection {
    pub fn new(tid: Tid, nid: Nid) -> Self {
        Self { tid, nid }
    }
}

/// Unordered set of connections.
pub type ConnectionSet = BTreeSet<Connection>;

/// Distinct destination nodes of a connection set.
pub fn destinations(connections: &ConnectionSet) -> BTreeSet<Nid> {
    connections.iter().map(|connection| connection.nid).collect()
}

/// Source nodes of a phase, derived from its tasks.
#[derive(Clone, Debug, Default)]
pub struct SourceNodes {
    /// Distinct source nodes in task id order.
    pub nids: Vec<Nid>,
    /// Task bound to each source node.
    pub nid2tid: BTreeMap<Nid, Tid>,
    /// All source task ids.
    pub tids: Vec<Tid>,
}

impl SourceNodes {
    /// Fails if two tasks share a node, since matching binds one task to every source node.
    pub fn from_tasks(tasks: &BTreeMap<Tid, Task>) -> Result<Self> {
        let mut result = SourceNodes::default();
        for (&tid, task) in tasks.iter() {
            if let Some(other) = result.nid2tid.get(&task.nid) {
                return Err(PlacementError::InvalidConfig(format!(
                    "tasks {} and {} both run on node {}",
                    other, tid, task.nid
                )));
            }
            result.tids.push(tid);
            result.nids.push(task.nid);
            result.nid2tid.insert(task.nid, tid);
        }
        Ok(result)
    }
}

/// Immutable pair of a cost and the connection set it was computed for.
///
/// Lower cost is better, [INFEASIBLE_COST] marks a candidate without a valid assignment.
#[derive(Clone, Debug)]
pub struct CostAndConn {
    cost: f64,
    connections: ConnectionSet,
}

impl CostAndConn {
    /// Creates new candidate. NaN and negative costs are rejected, costs above [INFEASIBLE_COST] saturate.
    pub fn new(cost: f64, connections: ConnectionSet) -> Result<Self> {
        if cost.is_nan() || cost < 0.0 {
            return Err(PlacementError::InvalidCost(cost));
        }
        Ok(Self {
            cost: cost.min(INFEASIBLE_COST),
            connections,
        })
    }

    /// Candidate which can't be used.
    pub fn infeasible(connections: ConnectionSet) -> Self {
        Self {
            cost: INFEASIBLE_COST,
            connections,
        }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn connections(&self) -> &ConnectionSet {
        &self.connections
    }

    pub fn into_connections(self) -> ConnectionSet {
        self.connections
    }

    pub fn is_infeasible(&self) -> bool {
        self.cost >= INFEASIBLE_COST
    }
}

impl PartialEq for CostAndConn {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CostAndConn {}

impl PartialOrd for CostAndConn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CostAndConn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.connections.cmp(&other.connections))
    }
}
