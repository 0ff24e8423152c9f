use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, error, info, warn};
use tempfile::NamedTempFile;

use crate::configuration::types::StorageConfig;
use crate::error_handling::types::StorageError;
use crate::storage::storage_trait::StatsStorage;
use crate::storage::types::StatsDocument;

/// Environment variable overriding the storage directory when the configuration does not
/// set one.
pub const STORAGE_DIR_ENV: &str = "TARPIT_WATCH_DIR";

/// Stats document and snapshot report kept as two files in one directory.
///
/// Both files are replaced atomically: content goes to a temporary sibling which is then
/// renamed over the destination, so a reader sees either the old or the new file and a
/// crash mid-write leaves the previous document intact.
pub struct FileStorage {
    stats_path: PathBuf,
    snapshot_path: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(
        base_path: P,
        stats_file: &str,
        snapshot_file: &str,
    ) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).map_err(|e| {
            error!("Failed to create storage dir {}: {}", base_path.display(), e);
            StorageError::WriteFailed(format!("{}: {}", base_path.display(), e))
        })?;
        info!("FileStorage initialized at {}", base_path.display());

        Ok(Self {
            stats_path: base_path.join(stats_file),
            snapshot_path: base_path.join(snapshot_file),
        })
    }

    /// Construct FileStorage from configuration. Directory precedence: the configured one,
    /// then `TARPIT_WATCH_DIR`, then `$HOME`, then the current directory.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let dir = match &config.directory {
            Some(dir) => dir.clone(),
            None => Self::default_dir()?,
        };
        Self::new(dir, &config.stats_file, &config.snapshot_file)
    }

    fn default_dir() -> Result<PathBuf, StorageError> {
        if let Ok(dir) = std::env::var(STORAGE_DIR_ENV) {
            info!("Using storage directory from {}: {}", STORAGE_DIR_ENV, dir);
            return Ok(PathBuf::from(dir));
        }
        if let Some(home) = std::env::var_os("HOME") {
            return Ok(PathBuf::from(home));
        }
        std::env::current_dir().map_err(|e| {
            error!("Failed to get current dir: {}", e);
            StorageError::ReadFailed(e.to_string())
        })
    }

    pub fn stats_path(&self) -> &Path {
        &self.stats_path
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    fn read_document(&self) -> Result<StatsDocument, StorageError> {
        let content = fs::read_to_string(&self.stats_path)
            .map_err(|e| StorageError::ReadFailed(format!("{}: {}", self.stats_path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| StorageError::SerializationFailed(e.to_string()))
    }
}

/// Writes `content` to a temporary file next to `path`, then renames it over `path`.
///
/// The temporary file is removed if anything fails before the rename.
pub fn atomic_write(path: &Path, content: &str) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let fail = |what: &str, e: std::io::Error| {
        error!("Failed to {} {}: {}", what, path.display(), e);
        StorageError::WriteFailed(format!("{} {}: {}", what, path.display(), e))
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| fail("create temp file for", e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| fail("write temp file for", e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| fail("sync temp file for", e))?;
    tmp.persist(path).map_err(|e| fail("rename temp file over", e.error))?;
    debug!("Wrote {} byte(s) to {}", content.len(), path.display());
    Ok(())
}

impl StatsStorage for FileStorage {
    fn load(&self) -> StatsDocument {
        if !self.stats_path.exists() {
            info!("No stats at {}, starting fresh", self.stats_path.display());
            return StatsDocument::new();
        }
        match self.read_document() {
            Ok(mut doc) => {
                doc.upgrade();
                info!(
                    "Loaded stats from {} ({} history record(s), {} port(s) counted)",
                    self.stats_path.display(),
                    doc.ended_history.len(),
                    doc.lifetime_port_hits.len()
                );
                doc
            }
            Err(e) => {
                warn!(
                    "Failed to load stats from {}, starting fresh: {}",
                    self.stats_path.display(),
                    e
                );
                StatsDocument::with_note(format!("Failed to load stats; started new. error={}", e))
            }
        }
    }

    fn save(&self, doc: &mut StatsDocument) -> Result<(), StorageError> {
        // the caller's document only takes the new stamp once the write went through
        let mut stamped = doc.clone();
        stamped.upgrade();
        stamped.updated = Utc::now();
        let mut json = serde_json::to_string_pretty(&stamped)
            .map_err(|e| StorageError::SerializationFailed(e.to_string()))?;
        json.push('\n');
        atomic_write(&self.stats_path, &json)?;
        *doc = stamped;
        info!("Saved stats to {}", self.stats_path.display());
        Ok(())
    }

    fn write_snapshot(&self, text: &str) -> Result<(), StorageError> {
        atomic_write(&self.snapshot_path, text)?;
        info!("Saved snapshot to {}", self.snapshot_path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.stats_path.display().to_string()
    }
}
