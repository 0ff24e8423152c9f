//! Network observation subsystem
//!
//! Everything between the kernel's connection-tracking table and the session store.
//!
//! Components:
//! - `types`: `TcpState` and `FlowKey`, shared with the session store.
//! - `flow_record`: normalization of raw conntrack lines into `FlowRecord`s.
//! - `connection_filter`: per-poll admission rules (watched ports, private sources, admin ports,
//!   established-only mode).
//! - `conntrack_source`: the `FlowSource` capability and its conntrack adapter.
//! - `port_source`: the `ListeningPortSource` capability and its static adapter.

pub mod connection_filter;
pub mod conntrack_source;
pub mod flow_record;
pub mod port_source;
pub mod types;

pub use connection_filter::ConnectionFilter;
pub use conntrack_source::{ConntrackSource, FlowSource};
pub use flow_record::FlowRecord;
pub use port_source::{ListeningPortSource, StaticPortSource};
pub use types::{FlowKey, TcpState};
