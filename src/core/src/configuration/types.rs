use serde::Deserialize;
use std::path::PathBuf;

/// Ports used for administering a T-Pot host (SSH and web UI). Never tracked while
/// hide-admin is active.
pub const DEFAULT_ADMIN_PORTS: [u16; 3] = [64295, 64294, 64297];

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub hide_private: bool,
    pub hide_admin: bool,
    pub established_only: bool,
    pub admin_ports: Vec<u16>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            hide_private: true,
            hide_admin: true,
            established_only: false,
            admin_ports: DEFAULT_ADMIN_PORTS.to_vec(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct ConntrackConfig {
    pub program: String,
    pub timeout_secs: f64,
}

impl Default for ConntrackConfig {
    fn default() -> Self {
        Self {
            program: String::from("conntrack"),
            timeout_secs: 6.0,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the stats and snapshot files. Falls back to
    /// `TARPIT_WATCH_DIR`, then `$HOME`, then the current directory.
    pub directory: Option<PathBuf>,
    pub stats_file: String,
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: None,
            stats_file: String::from(".tarpit_watch_stats.json"),
            snapshot_file: String::from(".tarpit_watch_snapshot.txt"),
        }
    }
}

/// Static port to container-name mapping entry.
#[derive(Debug, PartialEq, Clone, Deserialize)]
pub struct ContainerMapping {
    pub name: String,
    pub ports: Vec<u16>,
}
