use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddrV4};
use tracing::debug;

use crate::procnet::{ProcNetError, read_proc_file};

/// Kernel TCP socket table (IPv4)
pub const PROC_NET_TCP: &str = "/proc/net/tcp";
/// Kernel UDP socket table (IPv4)
pub const PROC_NET_UDP: &str = "/proc/net/udp";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SocketProtocol {
    Tcp,
    Udp,
}

/// TCP state codes from the `st` column (include/net/tcp_states.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Unknown(u8),
}

impl TcpState {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => TcpState::Established,
            0x02 => TcpState::SynSent,
            0x03 => TcpState::SynRecv,
            0x04 => TcpState::FinWait1,
            0x05 => TcpState::FinWait2,
            0x06 => TcpState::TimeWait,
            0x07 => TcpState::Close,
            0x08 => TcpState::CloseWait,
            0x09 => TcpState::LastAck,
            0x0A => TcpState::Listen,
            0x0B => TcpState::Closing,
            other => TcpState::Unknown(other),
        }
    }

    pub fn label(&self) -> String {
        match self {
            TcpState::Established => "ESTABLISHED".into(),
            TcpState::SynSent => "SYN_SENT".into(),
            TcpState::SynRecv => "SYN_RECV".into(),
            TcpState::FinWait1 => "FIN_WAIT1".into(),
            TcpState::FinWait2 => "FIN_WAIT2".into(),
            TcpState::TimeWait => "TIME_WAIT".into(),
            TcpState::Close => "CLOSE".into(),
            TcpState::CloseWait => "CLOSE_WAIT".into(),
            TcpState::LastAck => "LAST_ACK".into(),
            TcpState::Listen => "LISTEN".into(),
            TcpState::Closing => "CLOSING".into(),
            TcpState::Unknown(code) => format!("UNKNOWN({:02X})", code),
        }
    }
}

/// One row of `/proc/net/tcp` or `/proc/net/udp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketEntry {
    pub protocol: SocketProtocol,
    pub local: SocketAddrV4,
    pub remote: SocketAddrV4,
    /// Raw state; only meaningful as a [`TcpState`] for TCP sockets
    pub state: TcpState,
    pub tx_queue: u32,
    pub rx_queue: u32,
}

/// Socket counts reported by `--connections`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionStats {
    pub tcp_total: u32,
    pub tcp_established: u32,
    pub udp_total: u32,
}

/// Parse `ADDR:PORT` where ADDR is the IPv4 address as a host-order hex u32
fn parse_hex_addr(field: &str) -> Option<SocketAddrV4> {
    let (addr, port) = field.split_once(':')?;
    if addr.len() != 8 {
        return None;
    }
    let raw = u32::from_str_radix(addr, 16).ok()?;
    let port = u16::from_str_radix(port, 16).ok()?;
    // The kernel prints the in-memory (network order) word as a native integer
    Some(SocketAddrV4::new(Ipv4Addr::from(raw.to_ne_bytes()), port))
}

/// Parse `tx_queue:rx_queue`
fn parse_queues(field: &str) -> Option<(u32, u32)> {
    let (tx, rx) = field.split_once(':')?;
    Some((
        u32::from_str_radix(tx, 16).ok()?,
        u32::from_str_radix(rx, 16).ok()?,
    ))
}

fn parse_socket_line(line: &str, protocol: SocketProtocol) -> Option<SocketEntry> {
    // sl local_address rem_address st tx_queue:rx_queue ...
    let mut fields = line.split_whitespace();
    let _slot = fields.next()?;
    let local = parse_hex_addr(fields.next()?)?;
    let remote = parse_hex_addr(fields.next()?)?;
    let state = TcpState::from_code(u8::from_str_radix(fields.next()?, 16).ok()?);
    let (tx_queue, rx_queue) = parse_queues(fields.next()?)?;

    Some(SocketEntry {
        protocol,
        local,
        remote,
        state,
        tx_queue,
        rx_queue,
    })
}

/// Parse a kernel socket table, skipping the header line
pub fn parse_socket_table(content: &str, protocol: SocketProtocol) -> Vec<SocketEntry> {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let entry = parse_socket_line(line, protocol);
            if entry.is_none() {
                debug!("skipping malformed {:?} socket line: {:?}", protocol, line);
            }
            entry
        })
        .collect()
}

/// Tally totals over parsed entries
pub fn connection_stats(entries: &[SocketEntry]) -> ConnectionStats {
    entries
        .iter()
        .fold(ConnectionStats::default(), |mut stats, entry| {
            match entry.protocol {
                SocketProtocol::Tcp => {
                    stats.tcp_total += 1;
                    if entry.state == TcpState::Established {
                        stats.tcp_established += 1;
                    }
                }
                SocketProtocol::Udp => stats.udp_total += 1,
            }
            stats
        })
}

/// Count TCP sockets per state, sorted by state
pub fn tcp_state_counts(entries: &[SocketEntry]) -> Vec<(TcpState, u32)> {
    let mut counts = std::collections::BTreeMap::new();
    for entry in entries
        .iter()
        .filter(|e| e.protocol == SocketProtocol::Tcp)
    {
        *counts.entry(entry.state).or_insert(0u32) += 1;
    }
    counts.into_iter().collect()
}

/// All IPv4 TCP and UDP sockets on the host
pub fn list_connections() -> Result<Vec<SocketEntry>, ProcNetError> {
    let mut entries = parse_socket_table(&read_proc_file(PROC_NET_TCP)?, SocketProtocol::Tcp);
    entries.extend(parse_socket_table(
        &read_proc_file(PROC_NET_UDP)?,
        SocketProtocol::Udp,
    ));
    Ok(entries)
}

/// Totals for the host's IPv4 TCP and UDP sockets
pub fn get_connection_stats() -> Result<ConnectionStats, ProcNetError> {
    Ok(connection_stats(&list_connections()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex_addr(ip: Ipv4Addr, port: u16) -> String {
        format!("{:08X}:{:04X}", u32::from_ne_bytes(ip.octets()), port)
    }

    fn tcp_table() -> String {
        let header = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";
        let host = Ipv4Addr::new(192, 168, 1, 5);
        let web = Ipv4Addr::new(93, 184, 216, 34);
        let peer = Ipv4Addr::new(10, 0, 0, 9);
        let rows = [
            (Ipv4Addr::LOCALHOST, 53, Ipv4Addr::UNSPECIFIED, 0, "0A", "00000000:00000000"),
            (host, 43210, web, 443, "01", "00000010:00000000"),
            (host, 43211, web, 443, "06", "00000000:00000000"),
            (host, 22, peer, 51000, "01", "00000000:0000002A"),
        ];
        let mut table = format!("{}\n", header);
        for (i, (l, lp, r, rp, st, q)) in rows.iter().enumerate() {
            table.push_str(&format!(
                "   {}: {} {} {} {} 00:00000000 00000000  1000        0 12345 1 0000000000000000 20 4 30 10 -1\n",
                i,
                hex_addr(*l, *lp),
                hex_addr(*r, *rp),
                st,
                q
            ));
        }
        table
    }

    #[test]
    fn test_tcp_state_codes() {
        assert_eq!(TcpState::from_code(0x01), TcpState::Established);
        assert_eq!(TcpState::from_code(0x0A), TcpState::Listen);
        assert_eq!(TcpState::from_code(0x0B), TcpState::Closing);
        assert_eq!(TcpState::from_code(0x0C), TcpState::Unknown(0x0C));
        assert_eq!(TcpState::TimeWait.label(), "TIME_WAIT");
        assert_eq!(TcpState::Unknown(0x0C).label(), "UNKNOWN(0C)");
    }

    #[test]
    fn test_parse_hex_addr() {
        let field = hex_addr(Ipv4Addr::new(127, 0, 0, 1), 0x0035);
        assert_eq!(
            parse_hex_addr(&field),
            Some(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 53))
        );
        assert_eq!(parse_hex_addr("zz:0035"), None);
        assert_eq!(parse_hex_addr("0100007F"), None);
    }

    #[test]
    fn test_parse_tcp_table() {
        let entries = parse_socket_table(&tcp_table(), SocketProtocol::Tcp);
        assert_eq!(entries.len(), 4);

        assert_eq!(entries[0].state, TcpState::Listen);
        assert_eq!(entries[0].local, SocketAddrV4::new(Ipv4Addr::LOCALHOST, 53));

        let established = &entries[1];
        assert_eq!(established.state, TcpState::Established);
        assert_eq!(established.remote, SocketAddrV4::new(Ipv4Addr::new(93, 184, 216, 34), 443));
        assert_eq!(established.tx_queue, 0x10);
        assert_eq!(entries[3].rx_queue, 0x2A);
    }

    #[test]
    fn test_connection_stats() {
        let mut entries = parse_socket_table(&tcp_table(), SocketProtocol::Tcp);
        let udp = format!(
            "  sl  local_address rem_address   st tx_queue rx_queue\n   0: {} {} 07 00000000:00000000 00:00000000 00000000\n",
            hex_addr(Ipv4Addr::UNSPECIFIED, 68),
            hex_addr(Ipv4Addr::UNSPECIFIED, 0)
        );
        entries.extend(parse_socket_table(&udp, SocketProtocol::Udp));

        let stats = connection_stats(&entries);
        assert_eq!(
            stats,
            ConnectionStats {
                tcp_total: 4,
                tcp_established: 2,
                udp_total: 1,
            }
        );
    }

    #[test]
    fn test_tcp_state_counts() {
        let entries = parse_socket_table(&tcp_table(), SocketProtocol::Tcp);
        let counts = tcp_state_counts(&entries);
        assert_eq!(
            counts,
            vec![
                (TcpState::Established, 2),
                (TcpState::TimeWait, 1),
                (TcpState::Listen, 1),
            ]
        );
    }

    #[test]
    fn test_empty_and_malformed_tables() {
        assert!(parse_socket_table("", SocketProtocol::Tcp).is_empty());
        let junk = "header\n   0: nonsense\n\n";
        assert!(parse_socket_table(junk, SocketProtocol::Udp).is_empty());
    }
}
