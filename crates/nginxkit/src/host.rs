//! Host capability probing.

use std::net::{Ipv6Addr, SocketAddr, UdpSocket};

/// Facts about the managed host that influence validation.
pub trait HostFacts: Send + Sync {
    /// Whether the host can listen on IPv6 addresses
    fn has_ipv6(&self) -> bool;
}

/// Fixed host facts, for tests and for callers that already know the answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticHost {
    pub ipv6: bool,
}

impl StaticHost {
    /// A host with both IPv4 and IPv6
    pub fn dual_stack() -> Self {
        Self { ipv6: true }
    }

    /// A host without IPv6
    pub fn ipv4_only() -> Self {
        Self { ipv6: false }
    }
}

impl HostFacts for StaticHost {
    fn has_ipv6(&self) -> bool {
        self.ipv6
    }
}

/// Probes the running system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl HostFacts for SystemHost {
    fn has_ipv6(&self) -> bool {
        let loopback = SocketAddr::from((Ipv6Addr::LOCALHOST, 0));
        match UdpSocket::bind(loopback) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("IPv6 probe failed: {}", e);
                false
            }
        }
    }
}
