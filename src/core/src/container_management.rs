//! Container labeling.
//!
//! On a honeypot host each watched port is usually forwarded to a container. The core only
//! needs the container's name to annotate ended sessions, through [`ContainerLabeler`].
//!
//! Re-exports:
//! - [`ContainerLabeler`]: the lookup capability.
//! - [`StaticLabeler`]: table built from the `[[containers]]` configuration entries.

pub mod labeler;

pub use labeler::{ContainerLabeler, StaticLabeler};

/// Label used when no container is known for a port.
pub const UNMAPPED: &str = "unmapped";
