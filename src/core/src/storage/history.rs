//! History Archive
//!
//! A bounded "longest sessions ever observed" ranking, not a log: after every insertion
//! the records are ordered by `duration_s` descending and everything past the capacity is
//! dropped for good. Equal durations keep the most recently ended record first.

use super::types::EndedSession;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryArchive {
    records: Vec<EndedSession>,
}

fn by_rank(a: &EndedSession, b: &EndedSession) -> Ordering {
    b.duration_s
        .cmp(&a.duration_s)
        .then_with(|| b.ended_ts.cmp(&a.ended_ts))
}

impl HistoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: EndedSession, capacity: usize) -> usize {
        self.extend(std::iter::once(record), capacity)
    }

    /// Appends `records`, re-ranks, and truncates to `capacity`. Returns how many records
    /// were evicted.
    pub fn extend<I>(&mut self, records: I, capacity: usize) -> usize
    where
        I: IntoIterator<Item = EndedSession>,
    {
        self.records.extend(records);
        self.enforce_capacity(capacity)
    }

    /// Re-ranks and truncates without inserting. Needed after loading a document written
    /// with a larger capacity.
    pub fn enforce_capacity(&mut self, capacity: usize) -> usize {
        // stable: equal keys keep insertion order
        self.records.sort_by(by_rank);
        let evicted = self.records.len().saturating_sub(capacity);
        if evicted > 0 {
            self.records.truncate(capacity);
            debug!("History archive evicted {} record(s)", evicted);
        }
        evicted
    }

    /// A freshly sorted copy of the archive.
    pub fn ranked(&self) -> Vec<EndedSession> {
        let mut records = self.records.clone();
        records.sort_by(by_rank);
        records
    }

    pub fn as_slice(&self) -> &[EndedSession] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
