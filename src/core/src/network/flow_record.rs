//! # Flow Record Normalization
//!
//! Turns `conntrack -L -p tcp` output lines into typed [`FlowRecord`]s.
//!
//! ```text
//! tcp      6 431999 ESTABLISHED src=198.51.100.7 dst=203.0.113.9 sport=51234 dport=22 \
//!          src=172.18.0.2 dst=198.51.100.7 sport=2222 dport=51234 [ASSURED] mark=0 use=1
//! ```
//!
//! Parsing is lossy on purpose: anything that does not match the expected shape (other
//! protocols, IPv6 entries, truncated lines, out of range numbers) is skipped and never
//! reported as an error.

use super::types::{FlowKey, TcpState};
use log::trace;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

/// Reply direction tuple of a conntrack entry. Informational only, sessions are keyed on
/// the original direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyTuple {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
}

/// One normalized connection-tracking entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub state: TcpState,
    /// Remaining kernel timeout in seconds.
    pub timeout_s: u64,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub reply: ReplyTuple,
}

impl FlowRecord {
    pub fn key(&self) -> FlowKey {
        FlowKey {
            src_ip: self.src_ip,
            src_port: self.src_port,
            dst_ip: self.dst_ip,
            dst_port: self.dst_port,
        }
    }
}

fn conntrack_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^tcp\s+\d+\s+(?P<timeout>\d+)\s+(?P<state>[A-Z_]+)\s+",
            r"src=(?P<src>\d+\.\d+\.\d+\.\d+)\s+dst=(?P<dst>\d+\.\d+\.\d+\.\d+)\s+",
            r"sport=(?P<sport>\d+)\s+dport=(?P<dport>\d+)\s+",
            r"(?:\[[A-Z_]+\]\s+)?",
            r"src=(?P<rsrc>\d+\.\d+\.\d+\.\d+)\s+dst=(?P<rdst>\d+\.\d+\.\d+\.\d+)\s+",
            r"sport=(?P<rsport>\d+)\s+dport=(?P<rdport>\d+)",
        ))
        .expect("conntrack line pattern is valid")
    })
}

/// Parses a single conntrack line, returning `None` when the line is not a well-formed
/// IPv4 TCP entry.
pub fn parse_line(line: &str) -> Option<FlowRecord> {
    let caps = conntrack_line().captures(line.trim())?;

    let ip = |name: &str| caps.name(name)?.as_str().parse::<Ipv4Addr>().ok();
    let port = |name: &str| caps.name(name)?.as_str().parse::<u16>().ok();

    Some(FlowRecord {
        state: TcpState::from(caps.name("state")?.as_str()),
        timeout_s: caps.name("timeout")?.as_str().parse().ok()?,
        src_ip: ip("src")?,
        src_port: port("sport")?,
        dst_ip: ip("dst")?,
        dst_port: port("dport")?,
        reply: ReplyTuple {
            src_ip: ip("rsrc")?,
            dst_ip: ip("rdst")?,
            src_port: port("rsport")?,
            dst_port: port("rdport")?,
        },
    })
}

/// Parses a whole conntrack dump, silently dropping lines that do not normalize.
pub fn parse_conntrack_output(output: &str) -> Vec<FlowRecord> {
    let records: Vec<FlowRecord> = output.lines().filter_map(parse_line).collect();
    trace!(
        "Normalized {} flow record(s) from {} line(s)",
        records.len(),
        output.lines().count()
    );
    records
}
