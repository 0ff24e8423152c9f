use crate::network::types::{FlowKey, TcpState};
use crate::session_management::session::Session;
use crate::storage::history::HistoryArchive;
use crate::storage::types::EndedSession;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

/// Read-only copy of an active session, as shown in the ranked views.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSessionRow {
    pub key: FlowKey,
    pub state: TcpState,
    pub timeout_s: u64,
    pub age: Duration,
}

impl ActiveSessionRow {
    fn from_session(session: &Session, now: Instant) -> Self {
        Self {
            key: session.key,
            state: session.state.clone(),
            timeout_s: session.timeout_s,
            age: session.age(now),
        }
    }
}

/// Active sessions grouped by source address.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub ip: Ipv4Addr,
    pub active: usize,
    /// Age of the oldest active session from this source.
    pub oldest: Duration,
    pub states: BTreeSet<TcpState>,
    pub ports: BTreeSet<u16>,
}

/// Presentation-ready aggregates, rebuilt from scratch on every poll.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionViews {
    /// `ESTABLISHED` first, then by descending age.
    pub top_sessions: Vec<ActiveSessionRow>,
    /// By descending active count, then descending oldest age.
    pub top_sources: Vec<SourceSummary>,
    /// Active sessions per destination port, by descending count.
    pub port_activity: Vec<(u16, usize)>,
    /// `ESTABLISHED` sessions by descending age.
    pub longest_established: Vec<ActiveSessionRow>,
    /// The history archive, by descending duration.
    pub ended_history: Vec<EndedSession>,
}

impl SessionViews {
    /// Derives every view from the active sessions and the history archive. `top_n` bounds
    /// all views except the port activity table and the ended history.
    pub fn build<'a, I>(sessions: I, history: &HistoryArchive, top_n: usize, now: Instant) -> Self
    where
        I: IntoIterator<Item = &'a Session>,
    {
        let rows: Vec<ActiveSessionRow> = sessions
            .into_iter()
            .map(|s| ActiveSessionRow::from_session(s, now))
            .collect();

        Self {
            top_sessions: top_sessions(&rows, top_n),
            top_sources: top_sources(&rows, top_n),
            port_activity: port_activity(&rows),
            longest_established: longest_established(&rows, top_n),
            ended_history: history.ranked(),
        }
    }
}

// Flow keys break remaining ties so that views are stable between polls.

pub fn top_sessions(rows: &[ActiveSessionRow], top_n: usize) -> Vec<ActiveSessionRow> {
    let mut ranked = rows.to_vec();
    ranked.sort_by_key(|r| (!r.state.is_established(), Reverse(r.age), r.key));
    ranked.truncate(top_n);
    ranked
}

pub fn top_sources(rows: &[ActiveSessionRow], top_n: usize) -> Vec<SourceSummary> {
    let mut groups: HashMap<Ipv4Addr, SourceSummary> = HashMap::new();
    for row in rows {
        let summary = groups.entry(row.key.src_ip).or_insert_with(|| SourceSummary {
            ip: row.key.src_ip,
            active: 0,
            oldest: Duration::ZERO,
            states: BTreeSet::new(),
            ports: BTreeSet::new(),
        });
        summary.active += 1;
        summary.oldest = summary.oldest.max(row.age);
        summary.states.insert(row.state.clone());
        summary.ports.insert(row.key.dst_port);
    }

    let mut ranked: Vec<SourceSummary> = groups.into_values().collect();
    ranked.sort_by_key(|s| (Reverse(s.active), Reverse(s.oldest), s.ip));
    ranked.truncate(top_n);
    ranked
}

pub fn port_activity(rows: &[ActiveSessionRow]) -> Vec<(u16, usize)> {
    let mut counts: BTreeMap<u16, usize> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.key.dst_port).or_insert(0) += 1;
    }
    let mut ranked: Vec<(u16, usize)> = counts.into_iter().collect();
    // stable over the port-ordered map: equal counts stay in port order
    ranked.sort_by_key(|(_, count)| Reverse(*count));
    ranked
}

pub fn longest_established(rows: &[ActiveSessionRow], top_n: usize) -> Vec<ActiveSessionRow> {
    let mut ranked: Vec<ActiveSessionRow> = rows
        .iter()
        .filter(|r| r.state.is_established())
        .cloned()
        .collect();
    ranked.sort_by_key(|r| (Reverse(r.age), r.key));
    ranked.truncate(top_n);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(src: [u8; 4], sport: u16, dport: u16, state: TcpState, age_s: u64) -> ActiveSessionRow {
        ActiveSessionRow {
            key: FlowKey {
                src_ip: Ipv4Addr::from(src),
                src_port: sport,
                dst_ip: Ipv4Addr::new(203, 0, 113, 9),
                dst_port: dport,
            },
            state,
            timeout_s: 300,
            age: Duration::from_secs(age_s),
        }
    }

    #[test]
    fn test_top_sessions_puts_established_first() {
        let rows = vec![
            row([198, 51, 100, 1], 1000, 22, TcpState::TimeWait, 500),
            row([198, 51, 100, 2], 1001, 22, TcpState::Established, 10),
            row([198, 51, 100, 3], 1002, 80, TcpState::Established, 90),
            row([198, 51, 100, 4], 1003, 80, TcpState::SynRecv, 1),
        ];

        let top = top_sessions(&rows, 3);
        let ages: Vec<u64> = top.iter().map(|r| r.age.as_secs()).collect();
        assert_eq!(ages, vec![90, 10, 500]);
    }

    #[test]
    fn test_top_sources_groups_by_address() {
        let rows = vec![
            row([198, 51, 100, 7], 1000, 22, TcpState::Established, 30),
            row([198, 51, 100, 7], 1001, 80, TcpState::SynRecv, 5),
            row([192, 0, 2, 1], 1002, 22, TcpState::Established, 400),
        ];

        let sources = top_sources(&rows, 10);
        assert_eq!(sources.len(), 2);
        let first = &sources[0];
        assert_eq!(first.ip, Ipv4Addr::new(198, 51, 100, 7));
        assert_eq!(first.active, 2);
        assert_eq!(first.oldest, Duration::from_secs(30));
        assert_eq!(first.ports, BTreeSet::from([22, 80]));
        assert_eq!(
            first.states,
            BTreeSet::from([TcpState::Established, TcpState::SynRecv])
        );
        assert_eq!(sources[1].active, 1);
    }

    #[test]
    fn test_top_sources_tie_breaks_on_oldest() {
        let rows = vec![
            row([198, 51, 100, 1], 1000, 22, TcpState::Established, 30),
            row([198, 51, 100, 2], 1001, 22, TcpState::Established, 300),
        ];
        let sources = top_sources(&rows, 1);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].ip, Ipv4Addr::new(198, 51, 100, 2));
    }

    #[test]
    fn test_port_activity_and_longest_established() {
        let rows = vec![
            row([198, 51, 100, 1], 1000, 80, TcpState::Established, 3),
            row([198, 51, 100, 2], 1001, 22, TcpState::Established, 60),
            row([198, 51, 100, 3], 1002, 22, TcpState::CloseWait, 120),
            row([198, 51, 100, 4], 1003, 443, TcpState::Established, 7),
        ];

        assert_eq!(port_activity(&rows), vec![(22, 2), (80, 1), (443, 1)]);

        let longest = longest_established(&rows, 2);
        let ages: Vec<u64> = longest.iter().map(|r| r.age.as_secs()).collect();
        assert_eq!(ages, vec![60, 7]);
    }

    #[test]
    fn test_empty_inputs_give_empty_views() {
        let views = SessionViews::build(
            std::iter::empty::<&Session>(),
            &HistoryArchive::new(),
            10,
            Instant::now(),
        );
        assert_eq!(views, SessionViews::default());
    }
}
