//! Controller
//!
//! The polling loop and the single owner of the watcher's mutable state.

pub mod controller_handler;


pub use controller_handler::{Controller, TickReport};
