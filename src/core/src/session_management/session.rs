use crate::network::flow_record::FlowRecord;
use crate::network::types::{FlowKey, TcpState};
use crate::storage::types::EndedSession;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// A flow currently tracked by the session store.
///
/// `first_seen` and `last_seen` are taken from the process-local monotonic clock and
/// always satisfy `last_seen >= first_seen`.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: FlowKey,
    pub state: TcpState,
    /// Kernel timeout at the last observation, informational only.
    pub timeout_s: u64,
    pub first_seen: Instant,
    pub last_seen: Instant,
}

impl Session {
    pub fn new(record: &FlowRecord, now: Instant) -> Self {
        Self {
            key: record.key(),
            state: record.state.clone(),
            timeout_s: record.timeout_s,
            first_seen: now,
            last_seen: now,
        }
    }

    /// Applies a fresh sighting of the same flow. `first_seen` is never touched.
    pub fn observe(&mut self, record: &FlowRecord, now: Instant) {
        self.state = record.state.clone();
        self.timeout_s = record.timeout_s;
        self.last_seen = self.last_seen.max(now);
    }

    pub fn dst_port(&self) -> u16 {
        self.key.dst_port
    }

    /// Time since the watcher first saw this flow.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_seen)
    }

    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_seen)
    }

    /// Span between first and last observation.
    pub fn observed_duration(&self) -> Duration {
        self.last_seen.saturating_duration_since(self.first_seen)
    }

    /// Converts the session into its archived form.
    pub fn finalize(self, ended_ts: DateTime<Utc>, container: String) -> EndedSession {
        EndedSession {
            ended_ts,
            src: self.key.src_ip,
            sport: self.key.src_port,
            dst: self.key.dst_ip,
            dport: self.key.dst_port,
            duration_s: self.observed_duration().as_secs(),
            state: self.state,
            container,
        }
    }
}
