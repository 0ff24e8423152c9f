//! Reporting subsystem
//!
//! Side-effect free derivations of the session store and the stats document.
//!
//! Components:
//! - `views`: ranked and grouped views recomputed on every poll.
//! - `snapshot`: the plain-text snapshot report.

pub mod snapshot;
pub mod views;

pub use snapshot::{build_snapshot_text, format_age};
pub use views::{ActiveSessionRow, SessionViews, SourceSummary};
