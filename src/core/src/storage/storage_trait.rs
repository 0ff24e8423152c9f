//! Storage Trait
//!
//! This module defines the `StatsStorage` trait, the persistence seam between the
//! controller and wherever the stats document and snapshot report end up.
//!
//! Implementors are responsible for:
//! - Loading the stats document, never failing: a missing or corrupt document yields a
//!   fresh one carrying a diagnostic note
//! - Saving the stats document atomically
//! - Writing the human-readable snapshot report

use crate::error_handling::types::StorageError;
use crate::storage::types::StatsDocument;

pub trait StatsStorage: Send + Sync {
    /// Loads the stats document, upgraded to the running schema.
    fn load(&self) -> StatsDocument;

    /// Persists `doc`, stamping its `updated` time and version first.
    fn save(&self, doc: &mut StatsDocument) -> Result<(), StorageError>;

    /// Persists the text snapshot report.
    fn write_snapshot(&self, text: &str) -> Result<(), StorageError>;

    /// Human readable location, used in status messages.
    fn location(&self) -> String;
}
