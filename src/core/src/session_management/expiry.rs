use super::session::Session;
use std::time::{Duration, Instant};

/// Decides when a vanished flow is considered ended.
///
/// A session is finalized once it is missing from the current snapshot and at least
/// `grace` has elapsed since its last sighting. Flows missing for less than that are kept
/// untouched, which absorbs snapshots that are briefly empty or incomplete.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpiryPolicy {
    grace: Duration,
}

impl ExpiryPolicy {
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(8);

    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    pub fn is_expired(&self, session: &Session, seen_this_poll: bool, now: Instant) -> bool {
        !seen_this_poll && session.idle(now) >= self.grace
    }
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_GRACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::flow_record::parse_line;

    #[test]
    fn test_grace_boundary() {
        let rec = parse_line("tcp 6 300 ESTABLISHED src=198.51.100.7 dst=203.0.113.9 sport=4444 dport=22 src=203.0.113.9 dst=198.51.100.7 sport=22 dport=4444").unwrap();
        let t0 = Instant::now();
        let session = Session::new(&rec, t0);
        let policy = ExpiryPolicy::default();

        assert!(!policy.is_expired(&session, false, t0 + Duration::from_millis(7999)));
        assert!(policy.is_expired(&session, false, t0 + Duration::from_secs(8)));
        // still present in the snapshot: never expired
        assert!(!policy.is_expired(&session, true, t0 + Duration::from_secs(60)));
    }
}
