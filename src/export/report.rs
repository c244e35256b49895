use std::io::Write;

use crate::procnet::{
    Bandwidth, ConnectionStats, SocketEntry, TcpState, format_bps, tcp_state_counts,
};
use crate::state::{LatencyResult, PacketLossStats};

/// List interfaces as printed by `--list`
pub fn write_interfaces<W: Write>(interfaces: &[String], mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "Available network interfaces:")?;
    if interfaces.is_empty() {
        writeln!(writer, "  No interfaces found (excluding loopback)")?;
    }
    for iface in interfaces {
        writeln!(writer, "  - {}", iface)?;
    }
    Ok(())
}

/// Single bandwidth reading
pub fn write_bandwidth<W: Write>(
    interface: &str,
    bw: &Bandwidth,
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(writer, "Interface: {}", interface)?;
    writeln!(writer, "  Download: {}", format_bps(bw.download_bps))?;
    writeln!(writer, "  Upload:   {}", format_bps(bw.upload_bps))?;
    Ok(())
}

/// One line per continuous monitor sample
pub fn format_monitor_line(time: &str, interface: &str, bw: &Bandwidth) -> String {
    format!(
        "[{}] {} - \u{2193} {} | \u{2191} {}",
        time,
        interface,
        format_bps(bw.download_bps),
        format_bps(bw.upload_bps)
    )
}

/// Result of a single latency probe
pub fn write_latency<W: Write>(result: &LatencyResult, mut writer: W) -> std::io::Result<()> {
    if result.success {
        writeln!(writer, "Reply from {}: time={:.3} ms", result.host, result.rtt_ms)
    } else {
        let reason = result
            .failure
            .map(|f| f.to_string())
            .unwrap_or_else(|| "failed".to_string());
        writeln!(writer, "No reply from {}: {}", result.host, reason)
    }
}

/// Summary of a packet loss run, ping-style
pub fn write_packet_loss<W: Write>(stats: &PacketLossStats, mut writer: W) -> std::io::Result<()> {
    writeln!(writer, "--- {} packet loss statistics ---", stats.host)?;
    if let Some(failure) = stats.failure {
        writeln!(writer, "Run failed: {}", failure)?;
    }
    writeln!(
        writer,
        "{} packets transmitted, {} received, {:.1}% packet loss",
        stats.sent, stats.received, stats.loss_pct
    )?;
    if stats.received > 0 {
        writeln!(
            writer,
            "rtt min/avg/max/jitter = {:.3}/{:.3}/{:.3}/{:.3} ms",
            stats.min_rtt_ms, stats.avg_rtt_ms, stats.max_rtt_ms, stats.jitter_ms
        )?;
    }
    Ok(())
}

/// Connection totals, per-state tally, and established connections
pub fn write_connections<W: Write>(
    stats: &ConnectionStats,
    entries: &[SocketEntry],
    mut writer: W,
) -> std::io::Result<()> {
    writeln!(writer, "Active connections:")?;
    writeln!(writer, "  TCP total:       {}", stats.tcp_total)?;
    writeln!(writer, "  TCP established: {}", stats.tcp_established)?;
    writeln!(writer, "  UDP total:       {}", stats.udp_total)?;

    let counts = tcp_state_counts(entries);
    if !counts.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "TCP sockets by state:")?;
        for (state, count) in counts {
            writeln!(writer, "  {:<12} {:>6}", state.label(), count)?;
        }
    }

    let established: Vec<&SocketEntry> = entries
        .iter()
        .filter(|e| e.state == TcpState::Established)
        .collect();
    if !established.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{:<24} {:<24} {:>8} {:>8}", "Local", "Remote", "Send-Q", "Recv-Q")?;
        writeln!(writer, "{}", "-".repeat(67))?;
        for entry in established {
            writeln!(
                writer,
                "{:<24} {:<24} {:>8} {:>8}",
                entry.local.to_string(),
                entry.remote.to_string(),
                entry.tx_queue,
                entry.rx_queue
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeFailure;
    use crate::procnet::SocketProtocol;
    use std::net::{Ipv4Addr, SocketAddrV4};

    fn render<F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>>(f: F) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_write_interfaces() {
        let out = render(|w| write_interfaces(&["eth0".to_string(), "wlan0".to_string()], w));
        assert_eq!(out, "Available network interfaces:\n  - eth0\n  - wlan0\n");

        let out = render(|w| write_interfaces(&[], w));
        assert!(out.contains("No interfaces found"));
    }

    #[test]
    fn test_write_bandwidth() {
        let bw = Bandwidth {
            download_bps: 2_500_000.0,
            upload_bps: 800.0,
        };
        let out = render(|w| write_bandwidth("eth0", &bw, w));
        assert!(out.contains("Download: 2.50 Mbps"));
        assert!(out.contains("Upload:   800.00 bps"));
    }

    #[test]
    fn test_monitor_line() {
        let bw = Bandwidth {
            download_bps: 1_500.0,
            upload_bps: 0.0,
        };
        assert_eq!(
            format_monitor_line("Mon Jan  1 00:00:00 2024", "eth0", &bw),
            "[Mon Jan  1 00:00:00 2024] eth0 - \u{2193} 1.50 Kbps | \u{2191} 0.00 bps"
        );
    }

    #[test]
    fn test_write_latency() {
        let ok = LatencyResult::success("1.1.1.1", std::time::Duration::from_micros(4_500));
        assert_eq!(render(|w| write_latency(&ok, w)), "Reply from 1.1.1.1: time=4.500 ms\n");

        let failed = LatencyResult::failed("1.1.1.1", ProbeFailure::Timeout);
        assert_eq!(render(|w| write_latency(&failed, w)), "No reply from 1.1.1.1: timed out\n");
    }

    #[test]
    fn test_write_packet_loss() {
        let stats = PacketLossStats::from_samples("h", 10, &[10.0; 10]);
        let out = render(|w| write_packet_loss(&stats, w));
        assert!(out.contains("10 packets transmitted, 10 received, 0.0% packet loss"));
        assert!(out.contains("10.000/10.000/10.000/0.000 ms"));

        let lost = PacketLossStats::from_samples("h", 10, &[]);
        let out = render(|w| write_packet_loss(&lost, w));
        assert!(out.contains("100.0% packet loss"));
        assert!(!out.contains("rtt"));
    }

    #[test]
    fn test_write_connections() {
        let entries = vec![SocketEntry {
            protocol: SocketProtocol::Tcp,
            local: SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 2), 40000),
            remote: SocketAddrV4::new(Ipv4Addr::new(10, 0, 0, 1), 443),
            state: TcpState::Established,
            tx_queue: 0,
            rx_queue: 7,
        }];
        let stats = ConnectionStats {
            tcp_total: 1,
            tcp_established: 1,
            udp_total: 0,
        };
        let out = render(|w| write_connections(&stats, &entries, w));
        assert!(out.contains("TCP established: 1"));
        assert!(out.contains("ESTABLISHED"));
        assert!(out.contains("10.0.0.1:443"));
    }
}
