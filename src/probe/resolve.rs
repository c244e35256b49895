use std::net::{IpAddr, Ipv4Addr, ToSocketAddrs};
use tracing::debug;

use crate::probe::ProbeError;

/// Resolve a literal IPv4 address or hostname to an IPv4 destination
///
/// Literal addresses are parsed without touching the resolver. Hostnames go
/// through the system resolver and the first IPv4 address wins.
pub fn resolve_ipv4(host: &str) -> Result<Ipv4Addr, ProbeError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(ProbeError::Resolve {
            host: host.to_string(),
            reason: "empty host".to_string(),
        });
    }

    // Try parsing as IP address first
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => return Ok(ip),
        Ok(IpAddr::V6(_)) => {
            return Err(ProbeError::Resolve {
                host: host.to_string(),
                reason: "IPv6 is not supported".to_string(),
            });
        }
        Err(_) => {}
    }

    let addrs = (host, 0).to_socket_addrs().map_err(|e| ProbeError::Resolve {
        host: host.to_string(),
        reason: e.to_string(),
    })?;

    let resolved = addrs
        .filter_map(|addr| match addr.ip() {
            IpAddr::V4(ip) => Some(ip),
            IpAddr::V6(_) => None,
        })
        .next()
        .ok_or_else(|| ProbeError::Resolve {
            host: host.to_string(),
            reason: "no IPv4 addresses found".to_string(),
        })?;

    debug!("resolved {} to {}", host, resolved);
    Ok(resolved)
}
