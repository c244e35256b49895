use std::net::Ipv4Addr;
use std::thread;
use tracing::{debug, info};

use crate::measure::{EchoSession, ProbeOptions};
use crate::probe::{IcmpSocket, ProbeTransport, resolve_ipv4};
use crate::state::{PacketLossStats, duration_ms};

/// Send `count` probes to `host` and report loss, RTT range, and jitter
pub fn detect_packet_loss(host: &str, count: u32) -> PacketLossStats {
    detect_packet_loss_with(host, count, &ProbeOptions::default())
}

/// [`detect_packet_loss`] with explicit options
pub fn detect_packet_loss_with(host: &str, count: u32, options: &ProbeOptions) -> PacketLossStats {
    let dest = match resolve_ipv4(host) {
        Ok(dest) => dest,
        Err(e) => {
            debug!("{}", e);
            return PacketLossStats::failed(host, e.failure());
        }
    };

    let mut socket = match IcmpSocket::open(options.timeout) {
        Ok(socket) => socket,
        Err(e) => {
            debug!("{}", e);
            return PacketLossStats::failed(host, e.failure());
        }
    };

    detect_packet_loss_over(&mut socket, host, dest, count, options)
}

/// Run the probe series over an already open transport
///
/// Sequences run 1..=count. Each probe gets its own deadline and must be
/// answered by a reply carrying its own sequence; anything else marks that
/// sequence lost. All `count` probes are always attempted.
pub fn detect_packet_loss_over<T: ProbeTransport>(
    transport: &mut T,
    host: &str,
    dest: Ipv4Addr,
    count: u32,
    options: &ProbeOptions,
) -> PacketLossStats {
    let mut session = EchoSession::new(transport, dest, options);
    let mut rtts = Vec::with_capacity(count as usize);

    for sequence in 1..=count {
        // Sequence numbers wrap past u16::MAX
        match session.round_trip(sequence as u16, true) {
            Ok(rtt) => rtts.push(duration_ms(rtt)),
            Err(e) => debug!("seq {} to {} lost: {}", sequence, dest, e),
        }

        if sequence < count && !options.interval.is_zero() {
            thread::sleep(options.interval);
        }
    }

    let stats = PacketLossStats::from_samples(host, count, &rtts);
    info!(
        "{} ({}): {}/{} replies, {:.1}% loss",
        host, dest, stats.received, stats.sent, stats.loss_pct
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeFailure;

    #[test]
    fn test_unresolvable_host() {
        let stats = detect_packet_loss("", 3);
        assert_eq!(stats.sent, 0);
        assert_eq!(stats.received, 0);
        assert_eq!(stats.loss_pct, 100.0);
        assert_eq!(stats.failure, Some(ProbeFailure::Resolution));
    }
}
