//! Tasks and identifiers.

use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
};

use serde::{Deserialize, Serialize};

/// Node id. Zero-based inside one snapshot, or the stable original id when used as a key of [NidRemap].
pub type Nid = usize;

/// Task id, unique across the whole run.
pub type Tid = u64;

/// Mapping from zero-based node ids of a snapshot to original node ids.
pub type NidRemap = BTreeMap<Nid, Nid>;

/// Execution unit of one phase, bound to a single node.
///
/// `Clone` produces an independent copy, which is what gets handed to the replay simulator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Id of the task.
    pub tid: Tid,
    /// Node which holds the task input and runs the task.
    pub nid: Nid,
    /// Share of the job input processed by this task.
    pub input_size: f64,
}

impl Task {
    /// Creates new task.
    pub fn new(tid: Tid, nid: Nid, input_size: f64) -> Self {
        Self { tid, nid, input_size }
    }
}

/// Generates monotonically increasing task ids.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next: AtomicU64,
}

impl TaskIdGenerator {
    /// Creates generator which starts from `first`.
    pub fn starting_at(first: Tid) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Returns fresh task id.
    pub fn next_tid(&self) -> Tid {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

