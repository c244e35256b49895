use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::io::{self, Read};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tracing::{debug, warn};

use crate::probe::ProbeError;

/// Smallest receive timeout handed to the kernel (zero means "block forever")
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Socket capability level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketCapability {
    /// Full raw socket access - received packets include the IP header
    Raw,
    /// Unprivileged ICMP socket (no IP header, kernel-assigned identifier)
    Dgram,
}

/// Send/receive seam used by the latency measurer and the loss engine
///
/// `recv` returns one datagram. A receive deadline expiry is reported as an
/// `io::Error` of kind `WouldBlock` or `TimedOut`.
pub trait ProbeTransport {
    /// Send one ICMP message to `dest`
    fn send_to(&mut self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize>;

    /// Receive one datagram into `buffer`
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Set the receive deadline for subsequent `recv` calls
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Whether received datagrams start with an IPv4 header
    fn capability(&self) -> SocketCapability;
}

/// Owned ICMP socket, closed on drop
#[derive(Debug)]
pub struct IcmpSocket {
    socket: Socket,
    capability: SocketCapability,
}

impl IcmpSocket {
    /// Open an ICMP socket with the given receive deadline
    ///
    /// Prefers a raw socket, falls back to an unprivileged datagram socket.
    pub fn open(timeout: Duration) -> Result<Self, ProbeError> {
        let (socket, capability) = match create_raw_icmp_socket() {
            Ok(socket) => (socket, SocketCapability::Raw),
            Err(raw_err) => {
                debug!("raw ICMP socket unavailable: {}", raw_err);
                let socket = create_dgram_icmp_socket().map_err(|_| ProbeError::Socket(raw_err))?;
                warn!("Raw ICMP socket denied; falling back to unprivileged ping socket");
                (socket, SocketCapability::Dgram)
            }
        };

        let mut icmp = Self { socket, capability };
        icmp.set_read_timeout(timeout).map_err(ProbeError::Socket)?;
        Ok(icmp)
    }
}

impl ProbeTransport for IcmpSocket {
    fn send_to(&mut self, packet: &[u8], dest: Ipv4Addr) -> io::Result<usize> {
        let addr = SockAddr::from(SocketAddr::V4(SocketAddrV4::new(dest, 0)));
        self.socket.send_to(packet, &addr)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        self.socket.read(buffer)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))
    }

    fn capability(&self) -> SocketCapability {
        self.capability
    }
}

/// Create a raw IPv4 ICMP socket
pub fn create_raw_icmp_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4))?;
    socket.set_nonblocking(false)?;
    Ok(socket)
}

/// Create an unprivileged IPv4 ICMP socket (SOCK_DGRAM)
pub fn create_dgram_icmp_socket() -> io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4))?;
    socket.set_nonblocking(false)?;
    Ok(socket)
}

/// True for the error kinds a receive deadline expiry produces
pub fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

/// Hint printed when no ICMP socket can be opened
pub fn permission_hint() -> String {
    let binary_path = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "netmon".to_string());

    format!(
        "Insufficient permissions for ICMP sockets.\n\n\
         Fix options:\n\
         \u{2022} Run with sudo: sudo netmon --ping <host>\n\
         \u{2022} Add capability: sudo setcap cap_net_raw+ep {}\n\
         \u{2022} Enable unprivileged ICMP: sudo sysctl -w net.ipv4.ping_group_range='0 65534'",
        binary_path
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_timeout() {
        assert!(is_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_timeout(&io::Error::from(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn test_permission_hint_mentions_fixes() {
        let hint = permission_hint();
        assert!(hint.contains("cap_net_raw"));
        assert!(hint.contains("ping_group_range"));
    }
}
