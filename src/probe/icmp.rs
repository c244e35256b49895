use pnet::packet::ipv4::Ipv4Packet;
use thiserror::Error;

/// ICMP header size (fixed)
pub const ICMP_HEADER_SIZE: usize = 8;
/// Default payload size (standard ping)
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;
/// Minimum payload size (identifier + sequence echo)
pub const MIN_PAYLOAD_SIZE: usize = 4;

/// ICMP Echo Reply type
pub const ICMP_ECHO_REPLY: u8 = 0;
/// ICMP Echo Request type
pub const ICMP_ECHO_REQUEST: u8 = 8;

// Echo header field offsets (RFC 792)
const TYPE_OFFSET: usize = 0;
const CODE_OFFSET: usize = 1;
const CHECKSUM_OFFSET: usize = 2;
const IDENTIFIER_OFFSET: usize = 4;
const SEQUENCE_OFFSET: usize = 6;

// Payload offsets of the identifier/sequence echo
const PAYLOAD_IDENTIFIER_OFFSET: usize = ICMP_HEADER_SIZE;
const PAYLOAD_SEQUENCE_OFFSET: usize = ICMP_HEADER_SIZE + 2;

/// Get process identifier for ICMP identification field
pub fn get_identifier() -> u16 {
    std::process::id() as u16
}

/// Errors decoding a received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("packet too short: {len} bytes, need {needed}")]
    TooShort { len: usize, needed: usize },
    #[error("not an IPv4 packet (version {0})")]
    NotIpv4(u8),
    #[error("invalid ICMP checksum")]
    BadChecksum,
}

/// Why a well-formed datagram is not the reply we are waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Mismatch {
    #[error("ICMP type {icmp_type} code {code} is not an echo reply")]
    NotEchoReply { icmp_type: u8, code: u8 },
    #[error("identifier {got:#06x} does not match {expected:#06x}")]
    Identifier { expected: u16, got: u16 },
    #[error("sequence {got} does not match {expected}")]
    Sequence { expected: u16, got: u16 },
}

/// One's-complement checksum over `data` (RFC 1071)
///
/// Words are read big-endian; an odd trailing byte is padded with zero.
/// Running this over a packet whose checksum field is already filled in
/// yields 0.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;

    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u16::from_be_bytes([word[0], word[1]]) as u32;
    }

    // Handle odd byte
    if let [last] = words.remainder() {
        sum += (*last as u32) << 8;
    }

    // Fold 32-bit sum to 16 bits
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !(sum as u16)
}

/// Build an ICMP Echo Request packet with configurable payload size
///
/// Payload layout:
/// - Bytes 0-1: identifier (datagram sockets may rewrite the header identifier)
/// - Bytes 2-3: sequence
/// - Bytes 4+: pattern fill
pub fn build_echo_request(identifier: u16, sequence: u16, payload_size: usize) -> Vec<u8> {
    build_echo(ICMP_ECHO_REQUEST, identifier, sequence, payload_size)
}

/// Build an ICMP Echo packet of the given type with a valid checksum
///
/// Used for requests on the wire and for replies from simulated responders.
pub fn build_echo(icmp_type: u8, identifier: u16, sequence: u16, payload_size: usize) -> Vec<u8> {
    let payload_size = payload_size.max(MIN_PAYLOAD_SIZE);
    let mut buffer = vec![0u8; ICMP_HEADER_SIZE + payload_size];

    buffer[TYPE_OFFSET] = icmp_type;
    buffer[CODE_OFFSET] = 0;
    buffer[IDENTIFIER_OFFSET..IDENTIFIER_OFFSET + 2].copy_from_slice(&identifier.to_be_bytes());
    buffer[SEQUENCE_OFFSET..SEQUENCE_OFFSET + 2].copy_from_slice(&sequence.to_be_bytes());

    buffer[PAYLOAD_IDENTIFIER_OFFSET..PAYLOAD_IDENTIFIER_OFFSET + 2]
        .copy_from_slice(&identifier.to_be_bytes());
    buffer[PAYLOAD_SEQUENCE_OFFSET..PAYLOAD_SEQUENCE_OFFSET + 2]
        .copy_from_slice(&sequence.to_be_bytes());
    for (i, byte) in buffer[ICMP_HEADER_SIZE + MIN_PAYLOAD_SIZE..]
        .iter_mut()
        .enumerate()
    {
        *byte = (i & 0xFF) as u8;
    }

    // Checksum field is still zero here
    let cksum = checksum(&buffer);
    buffer[CHECKSUM_OFFSET..CHECKSUM_OFFSET + 2].copy_from_slice(&cksum.to_be_bytes());

    buffer
}

/// Decoded ICMP Echo header from a received datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoReply {
    pub icmp_type: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
    /// Identifier echoed in the payload, if the payload is long enough
    pub payload_identifier: Option<u16>,
    /// TTL from the IPv4 header (raw sockets only)
    pub ttl: Option<u8>,
    /// Length of the ICMP portion in bytes
    pub icmp_len: usize,
}

impl EchoReply {
    /// Check that this is the echo reply for `identifier` (and `sequence`, if given)
    pub fn check(&self, identifier: u16, sequence: Option<u16>) -> Result<(), Mismatch> {
        if self.icmp_type != ICMP_ECHO_REPLY || self.code != 0 {
            return Err(Mismatch::NotEchoReply {
                icmp_type: self.icmp_type,
                code: self.code,
            });
        }
        if self.identifier != identifier {
            return Err(Mismatch::Identifier {
                expected: identifier,
                got: self.identifier,
            });
        }
        if let Some(expected) = sequence
            && self.sequence != expected
        {
            return Err(Mismatch::Sequence {
                expected,
                got: self.sequence,
            });
        }
        Ok(())
    }

    /// Same as [`check`](Self::check), but matching on the payload identifier
    ///
    /// Linux ping sockets replace the header identifier with the socket's
    /// local port, so only the payload copy is ours.
    pub fn check_dgram(&self, identifier: u16, sequence: Option<u16>) -> Result<(), Mismatch> {
        let mut view = *self;
        view.identifier = self.payload_identifier.unwrap_or(self.identifier);
        view.check(identifier, sequence)
    }
}

/// Parse a received datagram into an Echo header
///
/// When `has_ip_header` is true (raw sockets), the buffer starts with an IPv4
/// header whose IHL field gives the offset of the ICMP header. Otherwise
/// (datagram sockets) the buffer starts at the ICMP header.
pub fn parse_echo_reply(data: &[u8], has_ip_header: bool) -> Result<EchoReply, ParseError> {
    let (offset, ttl) = if has_ip_header {
        let ip_packet = Ipv4Packet::new(data).ok_or(ParseError::TooShort {
            len: data.len(),
            needed: Ipv4Packet::minimum_packet_size() + ICMP_HEADER_SIZE,
        })?;
        let version = ip_packet.get_version();
        if version != 4 {
            return Err(ParseError::NotIpv4(version));
        }
        let ip_header_len = (ip_packet.get_header_length() as usize) * 4;
        (ip_header_len, Some(ip_packet.get_ttl()))
    } else {
        (0, None)
    };

    let needed = offset + ICMP_HEADER_SIZE;
    if data.len() < needed {
        return Err(ParseError::TooShort {
            len: data.len(),
            needed,
        });
    }

    let icmp = &data[offset..];
    if checksum(icmp) != 0 {
        return Err(ParseError::BadChecksum);
    }

    let payload_identifier = (icmp.len() >= PAYLOAD_IDENTIFIER_OFFSET + 2).then(|| {
        u16::from_be_bytes([
            icmp[PAYLOAD_IDENTIFIER_OFFSET],
            icmp[PAYLOAD_IDENTIFIER_OFFSET + 1],
        ])
    });

    Ok(EchoReply {
        icmp_type: icmp[TYPE_OFFSET],
        code: icmp[CODE_OFFSET],
        identifier: u16::from_be_bytes([icmp[IDENTIFIER_OFFSET], icmp[IDENTIFIER_OFFSET + 1]]),
        sequence: u16::from_be_bytes([icmp[SEQUENCE_OFFSET], icmp[SEQUENCE_OFFSET + 1]]),
        payload_identifier,
        ttl,
        icmp_len: icmp.len(),
    })
}
