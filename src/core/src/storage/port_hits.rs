use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per destination port count of distinct sessions first observed on that port.
///
/// Used both for the persisted lifetime counters and the run-scoped ones. Counts only
/// ever grow; the sole way down is [`PortHits::reset`]. Serialized as a JSON object keyed
/// by the port number as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortHits(BTreeMap<u16, u64>);

impl PortHits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one more session on `port` and returns the new total.
    pub fn record(&mut self, port: u16) -> u64 {
        let count = self.0.entry(port).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, port: u16) -> u64 {
        self.0.get(&port).copied().unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, u64)> + '_ {
        self.0.iter().map(|(p, c)| (*p, *c))
    }

    /// The `n` busiest ports, highest count first, lower port first on ties.
    pub fn top(&self, n: usize) -> Vec<(u16, u64)> {
        let mut items: Vec<(u16, u64)> = self.iter().collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        items.truncate(n);
        items
    }
}
