use super::expiry::ExpiryPolicy;
use super::session::Session;
use crate::network::connection_filter::ConnectionFilter;
use crate::network::flow_record::FlowRecord;
use crate::network::types::{FlowKey, TcpState};
use crate::storage::port_hits::PortHits;
use log::{debug, trace};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::time::Instant;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Admitted records per protocol state, duplicates included.
    pub state_counts: BTreeMap<TcpState, usize>,
    /// Flow keys present in this poll.
    pub seen_keys: HashSet<FlowKey>,
    /// Sessions created by this pass.
    pub new_sessions: usize,
}

impl Reconciliation {
    pub fn total(&self) -> usize {
        self.state_counts.values().sum()
    }
}

/// The session store.
///
/// Owns every active [`Session`], keyed by flow, along with the run-scoped port hit
/// counters. All mutation happens in [`SessionManager::reconcile`] and
/// [`SessionManager::cleanup_expired_sessions`], called once per poll.
///
/// # Fields Overview
///
/// - `active_sessions`: sessions seen in the latest poll or still within their grace window
/// - `run_port_hits`: sessions first seen per destination port since process start
/// - `expiry`: grace policy applied by `cleanup_expired_sessions`
pub struct SessionManager {
    active_sessions: HashMap<FlowKey, Session>,
    run_port_hits: PortHits,
    expiry: ExpiryPolicy,
}

impl SessionManager {
    pub fn new(expiry: ExpiryPolicy) -> Self {
        Self {
            active_sessions: HashMap::new(),
            run_port_hits: PortHits::new(),
            expiry,
        }
    }

    /// Folds one snapshot of flow records into the store.
    ///
    /// Records failing `filter` are ignored. A flow key seen for the first time creates a
    /// session and counts one hit for its destination port, in both the run-scoped counters
    /// and `lifetime_hits`; later sightings, in this poll or subsequent ones, only refresh
    /// the session. Nothing is removed here, see [`Self::cleanup_expired_sessions`].
    pub fn reconcile(
        &mut self,
        records: &[FlowRecord],
        watched: &BTreeSet<u16>,
        filter: &ConnectionFilter,
        lifetime_hits: &mut PortHits,
        now: Instant,
    ) -> Reconciliation {
        let mut outcome = Reconciliation::default();

        for record in records.iter().filter(|r| filter.admits(r, watched)) {
            let key = record.key();
            outcome.seen_keys.insert(key);
            *outcome.state_counts.entry(record.state.clone()).or_insert(0) += 1;

            match self.active_sessions.entry(key) {
                Entry::Occupied(mut entry) => entry.get_mut().observe(record, now),
                Entry::Vacant(entry) => {
                    trace!("New session {} ({})", key, record.state);
                    entry.insert(Session::new(record, now));
                    self.run_port_hits.record(key.dst_port);
                    lifetime_hits.record(key.dst_port);
                    outcome.new_sessions += 1;
                }
            }
        }

        debug!(
            "Reconciled {} record(s) into {} active session(s), {} new",
            outcome.total(),
            self.active_sessions.len(),
            outcome.new_sessions
        );
        outcome
    }

    /// Removes and returns the sessions the expiry policy considers ended, given the keys
    /// observed in the current poll. The order of the returned sessions is unspecified.
    pub fn cleanup_expired_sessions(
        &mut self,
        seen_keys: &HashSet<FlowKey>,
        now: Instant,
    ) -> Vec<Session> {
        let expired: Vec<FlowKey> = self
            .active_sessions
            .values()
            .filter(|s| {
                self.expiry
                    .is_expired(s, seen_keys.contains(&s.key), now)
            })
            .map(|s| s.key)
            .collect();

        let ended: Vec<Session> = expired
            .iter()
            .filter_map(|key| self.active_sessions.remove(key))
            .collect();
        if !ended.is_empty() {
            debug!("{} session(s) ended", ended.len());
        }
        ended
    }

    pub fn active_sessions(&self) -> impl Iterator<Item = &Session> {
        self.active_sessions.values()
    }

    pub fn get(&self, key: &FlowKey) -> Option<&Session> {
        self.active_sessions.get(key)
    }

    pub fn get_active_session_count(&self) -> usize {
        self.active_sessions.len()
    }

    pub fn run_port_hits(&self) -> &PortHits {
        &self.run_port_hits
    }

    pub fn expiry(&self) -> &ExpiryPolicy {
        &self.expiry
    }
}
