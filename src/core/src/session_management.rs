//! Session management core module.
//!
//! This module provides the session store: the live view of every flow currently
//! observed on a watched port, and the policy deciding when a vanished flow has ended.

/// Submodule for the grace-period expiry policy.
pub mod expiry;
/// Submodule for the tracked session type.
pub mod session;
/// Submodule for the session store and its per-poll reconciliation.
pub mod session_manager;

pub use expiry::ExpiryPolicy;
pub use session::Session;
pub use session_manager::{Reconciliation, SessionManager};
