//! Failure rate history backed by a table of samples.

use std::collections::BTreeMap;

use crate::{task::Nid, topology::HistoryStat};

/// Failure rates of nodes as step functions of time.
///
/// A sample holds from its timestamp until the next sample, the first one also covers earlier timestamps. Nodes
/// without samples have unusable (NaN) history.
#[derive(Clone, Debug, Default)]
pub struct FailureRateTable {
    samples: BTreeMap<Nid, Vec<(f64, f64)>>,
}

impl FailureRateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sample for an original node id.
    pub fn insert(&mut self, original_nid: Nid, timestamp: f64, rate: f64) {
        let samples = self.samples.entry(original_nid).or_default();
        let pos = samples.partition_point(|(t, _)| *t <= timestamp);
        samples.insert(pos, (timestamp, rate));
    }

    /// Table where every listed node has a constant failure rate.
    pub fn constant(rates: impl IntoIterator<Item = (Nid, f64)>) -> Self {
        let mut table = Self::new();
        for (nid, rate) in rates {
            table.insert(nid, 0.0, rate);
        }
        table
    }
}

impl HistoryStat for FailureRateTable {
    fn failure_rate(&self, original_nid: Nid, timestamp: f64) -> f64 {
        let Some(samples) = self.samples.get(&original_nid) else {
            return f64::NAN;
        };
        let pos = samples.partition_point(|(t, _)| *t <= timestamp);
        samples
            .get(pos.saturating_sub(1))
            .map(|(_, rate)| *rate)
            .unwrap_or(f64::NAN)
    }
}
