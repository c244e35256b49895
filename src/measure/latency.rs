use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::debug;

use crate::measure::{EchoSession, ProbeOptions};
use crate::probe::{IcmpSocket, ProbeTransport, resolve_ipv4};
use crate::state::LatencyResult;

/// Measure one echo round trip to `host`
///
/// Never fails: every error becomes `success = false` with a failure tag.
pub fn measure_latency(host: &str, timeout: Duration) -> LatencyResult {
    let options = ProbeOptions {
        timeout,
        ..ProbeOptions::default()
    };
    measure_latency_with(host, &options)
}

/// [`measure_latency`] with explicit options
pub fn measure_latency_with(host: &str, options: &ProbeOptions) -> LatencyResult {
    let dest = match resolve_ipv4(host) {
        Ok(dest) => dest,
        Err(e) => {
            debug!("{}", e);
            return LatencyResult::failed(host, e.failure());
        }
    };

    // Dropped on every return below
    let mut socket = match IcmpSocket::open(options.timeout) {
        Ok(socket) => socket,
        Err(e) => {
            debug!("{}", e);
            return LatencyResult::failed(host, e.failure());
        }
    };

    measure_latency_over(&mut socket, host, dest, options)
}

/// One probe with sequence 1 over an already open transport
///
/// The first datagram received decides the outcome unless the options ask
/// to wait out the deadline for a matching reply.
pub fn measure_latency_over<T: ProbeTransport>(
    transport: &mut T,
    host: &str,
    dest: Ipv4Addr,
    options: &ProbeOptions,
) -> LatencyResult {
    let mut session = EchoSession::new(transport, dest, options);
    match session.round_trip(1, false) {
        Ok(rtt) => LatencyResult::success(host, rtt),
        Err(e) => {
            debug!("latency probe to {} ({}) failed: {}", host, dest, e);
            LatencyResult::failed(host, e.failure())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeFailure;

    #[test]
    fn test_unresolvable_host() {
        let result = measure_latency("", Duration::from_millis(100));
        assert!(!result.success);
        assert_eq!(result.rtt_ms, 0.0);
        assert_eq!(result.failure, Some(ProbeFailure::Resolution));
        assert_eq!(result.host, "");
    }
}
