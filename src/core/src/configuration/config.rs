use super::types::*;
use crate::error_handling::types::ConfigError;
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Runtime configuration of the watcher.
///
/// Every field has a default so that an empty file, or no file at all, yields a working
/// setup. Values are read once at startup from a TOML document.
///
/// # Fields Overview
///
/// - `poll_interval_secs`: target delay between two conntrack polls
/// - `grace_secs`: how long a vanished flow is kept before being finalized
/// - `history_size`: capacity of the longest-ended-sessions archive
/// - `top_n`: row limit of every ranked view
/// - `autosave_secs`: interval between two automatic saves of the stats document
/// - `snapshot_rows`: row limit of each section of the text snapshot
/// - `watch_ports`: explicit watched ports (`"22,80,8000-8010"`); absent means the built-in list
/// - `filters`, `conntrack`, `storage`, `containers`: see their types
///
/// # Examples
///
/// ```
/// use tarpit_watch::configuration::config::Config;
///
/// let config = Config::from_toml_str("grace_secs = 12.0\n[filters]\nhide_private = false\n").unwrap();
/// assert_eq!(config.grace_secs, 12.0);
/// assert!(!config.filters.hide_private);
/// assert_eq!(config.history_size, 50);
/// ```
#[derive(Debug, PartialEq, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub poll_interval_secs: f64,
    pub grace_secs: f64,
    pub history_size: usize,
    pub top_n: usize,
    pub autosave_secs: u64,
    pub snapshot_rows: usize,
    pub watch_ports: Option<String>,
    pub filters: FilterConfig,
    pub conntrack: ConntrackConfig,
    pub storage: StorageConfig,
    pub containers: Vec<ContainerMapping>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_secs: 1.0,
            grace_secs: 8.0,
            history_size: 50,
            top_n: 10,
            autosave_secs: 60,
            snapshot_rows: 20,
            watch_ports: None,
            filters: FilterConfig::default(),
            conntrack: ConntrackConfig::default(),
            storage: StorageConfig::default(),
            containers: Vec::new(),
        }
    }
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Reading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        config.validate()?;
        debug!("Configuration parsed: {:?}", config);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_seconds("poll_interval_secs", self.poll_interval_secs)?;
        check_seconds("grace_secs", self.grace_secs)?;
        check_seconds("conntrack.timeout_secs", self.conntrack.timeout_secs)?;
        if self.autosave_secs > MAX_SECONDS as u64 {
            return Err(ConfigError::NotInRange(format!(
                "autosave_secs must be at most {}, got {}",
                MAX_SECONDS, self.autosave_secs
            )));
        }
        if self.autosave_secs == 0 {
            return Err(ConfigError::NotInRange(
                "autosave_secs must be > 0".to_string(),
            ));
        }
        if self.history_size == 0 {
            return Err(ConfigError::NotInRange(
                "history_size must be > 0".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(ConfigError::NotInRange("top_n must be > 0".to_string()));
        }
        for mapping in &self.containers {
            if mapping.ports.is_empty() {
                return Err(ConfigError::BadPortsRange(format!(
                    "container {} has no ports",
                    mapping.name
                )));
            }
        }
        Ok(())
    }

    // The duration accessors below expect a configuration that passed `validate`.

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs_f64(self.grace_secs)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.autosave_secs)
    }

    pub fn conntrack_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.conntrack.timeout_secs)
    }
}

/// Upper bound for every interval setting: one year.
const MAX_SECONDS: f64 = 365.0 * 86_400.0;

/// Rejects values that are not a usable, non-zero `Duration`, including positive values
/// small enough to round down to zero.
fn check_seconds(name: &str, value: f64) -> Result<Duration, ConfigError> {
    if !(value > 0.0 && value <= MAX_SECONDS) {
        return Err(ConfigError::NotInRange(format!(
            "{} must be in (0, {}], got {}",
            name, MAX_SECONDS, value
        )));
    }
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(ConfigError::NotInRange(format!(
            "{} is too small to be a usable interval, got {}",
            name, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.grace_period(), Duration::from_secs(8));
        assert_eq!(config.autosave_interval(), Duration::from_secs(60));
        assert_eq!(config.filters.admin_ports, vec![64295, 64294, 64297]);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
poll_interval_secs = 0.5
history_size = 10
watch_ports = "22,80,8000-8002"

[filters]
established_only = true

[storage]
directory = "/var/lib/tarpit"

[[containers]]
name = "cowrie"
ports = [22, 23]
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.poll_interval(), Duration::from_millis(500));
        assert_eq!(config.history_size, 10);
        assert_eq!(config.watch_ports.as_deref(), Some("22,80,8000-8002"));
        assert!(config.filters.established_only);
        assert!(config.filters.hide_private);
        assert_eq!(
            config.storage.directory.as_deref(),
            Some(Path::new("/var/lib/tarpit"))
        );
        assert_eq!(config.storage.stats_file, ".tarpit_watch_stats.json");
        assert_eq!(config.containers[0].name, "cowrie");
        assert_eq!(config.containers[0].ports, vec![22, 23]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/tarpit.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        assert!(matches!(
            Config::from_toml_str("history_size = 0"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("grace_secs = -1.0"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("grace_secs = 1e20"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("poll_interval_secs = 1e-12"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("grace_secs = nan"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[conntrack]\ntimeout_secs = inf\n"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("autosave_secs = 100000000"),
            Err(ConfigError::NotInRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[[containers]]\nname = \"x\"\nports = []\n"),
            Err(ConfigError::BadPortsRange(_))
        ));
        assert!(matches!(
            Config::from_toml_str("top_n = \"ten\""),
            Err(ConfigError::TomlError(_))
        ));
    }
}
