use std::net::Ipv4Addr;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::measure::{MatchPolicy, ProbeOptions};
use crate::probe::{
    ICMP_HEADER_SIZE, MIN_PAYLOAD_SIZE, ProbeError, ProbeTransport, SocketCapability,
    build_echo_request, is_timeout, parse_echo_reply,
};

/// Smallest receive buffer (one Ethernet MTU)
const MIN_RECV_BUFFER_SIZE: usize = 1500;
/// Largest IPv4 header (IHL 15)
const MAX_IPV4_HEADER_SIZE: usize = 60;

/// Receive buffer that holds a full reply to a request of `payload_size`
fn recv_buffer_size(payload_size: usize) -> usize {
    let reply = MAX_IPV4_HEADER_SIZE + ICMP_HEADER_SIZE + payload_size.max(MIN_PAYLOAD_SIZE);
    reply.max(MIN_RECV_BUFFER_SIZE)
}

/// One destination, one identifier, any number of echo round trips
///
/// Borrows the transport for its lifetime, so the caller's socket outlives
/// every probe and is released when the caller drops it.
pub struct EchoSession<'a, T: ProbeTransport> {
    transport: &'a mut T,
    dest: Ipv4Addr,
    options: &'a ProbeOptions,
    buffer: Vec<u8>,
}

impl<'a, T: ProbeTransport> EchoSession<'a, T> {
    pub fn new(transport: &'a mut T, dest: Ipv4Addr, options: &'a ProbeOptions) -> Self {
        Self {
            transport,
            dest,
            options,
            buffer: vec![0u8; recv_buffer_size(options.payload_size)],
        }
    }

    /// Send echo request `sequence` and wait for its reply
    ///
    /// With `require_sequence`, a reply carrying another sequence number is
    /// treated like a foreign reply. Returns the time between the send call
    /// and the receive call that delivered the matching reply.
    pub fn round_trip(
        &mut self,
        sequence: u16,
        require_sequence: bool,
    ) -> Result<Duration, ProbeError> {
        let identifier = self.options.identifier;
        let timeout = self.options.timeout;
        let packet = build_echo_request(identifier, sequence, self.options.payload_size);
        let dgram = self.transport.capability() == SocketCapability::Dgram;
        let expected_sequence = require_sequence.then_some(sequence);

        self.transport
            .set_read_timeout(timeout)
            .map_err(ProbeError::Receive)?;

        let sent_at = Instant::now();
        self.transport
            .send_to(&packet, self.dest)
            .map_err(ProbeError::Send)?;
        let deadline = sent_at + timeout;

        loop {
            let len = match self.transport.recv(&mut self.buffer) {
                Ok(len) => len,
                Err(e) if is_timeout(&e) => return Err(ProbeError::Timeout(timeout)),
                Err(e) => return Err(ProbeError::Receive(e)),
            };
            let received_at = Instant::now();

            let outcome = parse_echo_reply(&self.buffer[..len], !dgram)
                .map_err(ProbeError::from)
                .and_then(|reply| {
                    let checked = if dgram {
                        reply.check_dgram(identifier, expected_sequence)
                    } else {
                        reply.check(identifier, expected_sequence)
                    };
                    checked.map(|()| reply).map_err(ProbeError::from)
                });

            match outcome {
                Ok(reply) => {
                    let rtt = received_at.duration_since(sent_at);
                    trace!(
                        "seq {} reply from {} in {:?} ({} bytes, ttl {:?})",
                        sequence,
                        self.dest,
                        rtt,
                        reply.icmp_len,
                        reply.ttl
                    );
                    return Ok(rtt);
                }
                Err(e) if self.options.match_policy == MatchPolicy::UntilDeadline => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(ProbeError::Timeout(timeout));
                    }
                    debug!(
                        "seq {}: discarding datagram ({}), {:?} left",
                        sequence, e, remaining
                    );
                    self.transport
                        .set_read_timeout(remaining)
                        .map_err(ProbeError::Receive)?;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
