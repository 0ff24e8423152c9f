use super::flow_record::FlowRecord;
use crate::configuration::types::FilterConfig;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

/// Private-range predicate used by the hide-private toggle: RFC1918, loopback and
/// link-local sources.
pub fn is_private_source(ip: &Ipv4Addr) -> bool {
    ip.is_private() || ip.is_loopback() || ip.is_link_local()
}

/// Decides which flow records take part in reconciliation.
///
/// The toggles are operator controlled and may flip between polls; the admin
/// exclusion set is fixed at startup.
#[derive(Debug, Clone)]
pub struct ConnectionFilter {
    pub hide_private: bool,
    pub hide_admin: bool,
    pub established_only: bool,
    admin_ports: BTreeSet<u16>,
}

impl ConnectionFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            hide_private: config.hide_private,
            hide_admin: config.hide_admin,
            established_only: config.established_only,
            admin_ports: config.admin_ports.iter().copied().collect(),
        }
    }

    pub fn admin_ports(&self) -> &BTreeSet<u16> {
        &self.admin_ports
    }

    pub fn is_admin_port(&self, port: u16) -> bool {
        self.admin_ports.contains(&port)
    }

    /// Returns `true` when `record` should be tracked given the current watched-port set.
    pub fn admits(&self, record: &FlowRecord, watched: &BTreeSet<u16>) -> bool {
        if !watched.contains(&record.dst_port) {
            return false;
        }
        if self.hide_private && is_private_source(&record.src_ip) {
            return false;
        }
        if self.hide_admin && self.is_admin_port(record.dst_port) {
            return false;
        }
        if self.established_only && !record.state.is_established() {
            return false;
        }
        true
    }

    /// Short mode label, `ALL` or `EST`.
    pub fn mode_label(&self) -> &'static str {
        if self.established_only {
            "EST"
        } else {
            "ALL"
        }
    }
}
