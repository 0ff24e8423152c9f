use super::history::HistoryArchive;
use super::port_hits::PortHits;
use crate::container_management::UNMAPPED;
use crate::network::types::TcpState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Current layout of the persisted stats document.
pub const SCHEMA_VERSION: u32 = 1;

/// Selectable theme names, in cycling order. The first entry is the default.
pub const THEMES: [&str; 25] = [
    "amber", "matrix", "ocean", "ice", "violet", "sunset", "mono", "classic", "forest", "neon",
    "steel", "crimson", "cyan", "gold", "lava", "mint", "plasma", "midnight", "desert",
    "emerald", "slate", "royal", "retro", "hacker", "solar",
];

pub const DEFAULT_THEME: &str = THEMES[0];

/// Position of `theme` in [`THEMES`]; unknown names map to the default.
pub fn theme_index(theme: &str) -> usize {
    THEMES.iter().position(|t| *t == theme).unwrap_or(0)
}

/// A finished session as recorded in the history archive. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndedSession {
    pub ended_ts: DateTime<Utc>,
    pub src: Ipv4Addr,
    pub sport: u16,
    pub dst: Ipv4Addr,
    pub dport: u16,
    /// Last state observed before the flow disappeared.
    pub state: TcpState,
    /// Whole seconds between first and last observation.
    pub duration_s: u64,
    #[serde(default = "unmapped")]
    pub container: String,
}

fn unmapped() -> String {
    UNMAPPED.to_string()
}

fn current_schema() -> u32 {
    SCHEMA_VERSION
}

fn app_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_theme() -> String {
    DEFAULT_THEME.to_string()
}

/// The durable aggregate written to disk.
///
/// Every field has a serde default so documents written by older versions (or with
/// fields removed by hand) still load; defaults are applied once, at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsDocument {
    #[serde(default = "current_schema")]
    pub schema_version: u32,
    #[serde(default = "app_version")]
    pub version: String,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated: DateTime<Utc>,
    /// Diagnostic breadcrumbs, e.g. why a previous document could not be loaded.
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub lifetime_port_hits: PortHits,
    #[serde(default)]
    pub ended_history: HistoryArchive,
}

impl Default for StatsDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsDocument {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION,
            version: app_version(),
            created: now,
            updated: now,
            notes: Vec::new(),
            theme: default_theme(),
            lifetime_port_hits: PortHits::new(),
            ended_history: HistoryArchive::new(),
        }
    }

    /// A fresh document carrying a single note.
    pub fn with_note(note: impl Into<String>) -> Self {
        let mut doc = Self::new();
        doc.notes.push(note.into());
        doc
    }

    /// Stamps the document with the running schema and application version.
    pub fn upgrade(&mut self) {
        self.schema_version = SCHEMA_VERSION;
        self.version = app_version();
        if !THEMES.contains(&self.theme.as_str()) {
            self.theme = default_theme();
        }
    }

    /// Clears the lifetime port counters. The history archive is left alone.
    pub fn reset_lifetime_hits(&mut self) {
        self.lifetime_port_hits.reset();
    }
}
