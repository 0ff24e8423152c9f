use super::UNMAPPED;
use crate::configuration::types::ContainerMapping;
use log::{debug, warn};
use std::collections::HashMap;

/// Best-effort lookup of the container serving a host port.
///
/// Implementations never fail: an unknown port maps to [`UNMAPPED`].
pub trait ContainerLabeler: Send + Sync {
    fn label_for_port(&self, port: u16) -> String;
}

/// Port to container-name table fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticLabeler {
    port_map: HashMap<u16, String>,
}

impl StaticLabeler {
    pub fn new(port_map: HashMap<u16, String>) -> Self {
        Self { port_map }
    }

    /// Builds the table from `[[containers]]` entries. When two entries claim the same port
    /// the later one wins.
    pub fn from_mappings(mappings: &[ContainerMapping]) -> Self {
        let mut port_map = HashMap::new();
        for mapping in mappings {
            for port in &mapping.ports {
                if let Some(previous) = port_map.insert(*port, mapping.name.clone()) {
                    warn!(
                        "Port {} mapped to both {} and {}, keeping {}",
                        port, previous, mapping.name, mapping.name
                    );
                }
            }
        }
        debug!("Container labeler knows {} port(s)", port_map.len());
        Self { port_map }
    }
}

impl ContainerLabeler for StaticLabeler {
    fn label_for_port(&self, port: u16) -> String {
        self.port_map
            .get(&port)
            .cloned()
            .unwrap_or_else(|| UNMAPPED.to_string())
    }
}
