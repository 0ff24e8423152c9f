//! Watched-port discovery.
//!
//! The core only needs the set of destination ports to watch each tick. Where that set
//! comes from is behind [`ListeningPortSource`]; the static implementation here covers
//! explicit configuration and the built-in fallback list.

use log::warn;
use std::collections::BTreeSet;

/// Ports commonly exposed by honeypot fleets, used when nothing else is configured.
pub const FALLBACK_WATCH_PORTS: [u16; 50] = [
    21, 22, 23, 25, 53, 80, 110, 111, 135, 139, 143, 443, 445, 465, 587, 993, 995, 1433, 1521,
    1723, 1883, 2049, 2181, 2375, 2376, 3306, 3389, 5432, 5900, 5985, 5986, 6379, 6667, 7001,
    8000, 8008, 8080, 8088, 8443, 8888, 9000, 9200, 9300, 11211, 27017, 64296, 64298, 64299,
    64303, 64305,
];

/// Supplies the set of ports to watch for the current tick.
pub trait ListeningPortSource: Send + Sync {
    fn watched_ports(&self) -> BTreeSet<u16>;
}

/// A fixed list of ports, from configuration or the fallback list.
#[derive(Debug, Clone)]
pub struct StaticPortSource {
    ports: BTreeSet<u16>,
}

impl StaticPortSource {
    pub fn new(ports: BTreeSet<u16>) -> Self {
        Self { ports }
    }

    /// Builds the source from an optional port list string; an absent or empty list
    /// selects [`FALLBACK_WATCH_PORTS`].
    pub fn from_spec(spec: Option<&str>) -> Self {
        let ports = spec.map(parse_port_list).unwrap_or_default();
        if ports.is_empty() {
            return Self::fallback();
        }
        Self::new(ports)
    }

    pub fn fallback() -> Self {
        Self::new(FALLBACK_WATCH_PORTS.iter().copied().collect())
    }
}

impl ListeningPortSource for StaticPortSource {
    fn watched_ports(&self) -> BTreeSet<u16> {
        self.ports.clone()
    }
}

/// Parses `"22,80 443,8000-8010"` into a port set.
///
/// Tokens are separated by commas and/or whitespace. Ranges are inclusive and may be
/// written in either order. Unparsable tokens are skipped with a warning.
pub fn parse_port_list(spec: &str) -> BTreeSet<u16> {
    let mut ports = BTreeSet::new();
    for token in spec
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
    {
        match token.split_once('-') {
            Some((a, b)) => match (a.trim().parse::<u16>(), b.trim().parse::<u16>()) {
                (Ok(a), Ok(b)) => ports.extend(a.min(b)..=a.max(b)),
                _ => warn!("Ignoring invalid port range {:?}", token),
            },
            None => match token.parse::<u16>() {
                Ok(p) => {
                    ports.insert(p);
                }
                Err(_) => warn!("Ignoring invalid port {:?}", token),
            },
        }
    }
    ports
}
