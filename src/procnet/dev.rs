use std::collections::BTreeMap;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::procnet::{ProcNetError, read_proc_file};

/// Kernel interface counter table
pub const PROC_NET_DEV: &str = "/proc/net/dev";

/// Loopback is never listed as a monitorable interface
const LOOPBACK: &str = "lo";

/// Counter snapshot for one interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStats {
    pub name: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    /// When the snapshot was taken
    pub timestamp: Instant,
}

/// Throughput derived from two snapshots, in bits per second
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bandwidth {
    pub download_bps: f64,
    pub upload_bps: f64,
}

/// Parse `/proc/net/dev` text, stamping every entry with `at`
///
/// The two header lines are skipped. Each line is
/// `name: rx_bytes rx_packets errs drop fifo frame compressed multicast tx_bytes tx_packets ...`.
pub fn parse_net_dev(content: &str, at: Instant) -> BTreeMap<String, InterfaceStats> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let parsed = parse_net_dev_line(line, at);
            if parsed.is_none() && !line.trim().is_empty() {
                debug!("skipping malformed {} line: {:?}", PROC_NET_DEV, line);
            }
            parsed
        })
        .map(|stats| (stats.name.clone(), stats))
        .collect()
}

fn parse_net_dev_line(line: &str, at: Instant) -> Option<InterfaceStats> {
    let (name, counters) = line.split_once(':')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let fields: Vec<u64> = counters
        .split_whitespace()
        .map(|f| f.parse().ok())
        .collect::<Option<_>>()?;

    // 8 receive counters precede the transmit counters
    if fields.len() < 10 {
        return None;
    }

    Some(InterfaceStats {
        name: name.to_string(),
        rx_bytes: fields[0],
        rx_packets: fields[1],
        tx_bytes: fields[8],
        tx_packets: fields[9],
        timestamp: at,
    })
}

/// Read and parse the live interface table
pub fn read_net_dev() -> Result<BTreeMap<String, InterfaceStats>, ProcNetError> {
    let content = read_proc_file(PROC_NET_DEV)?;
    Ok(parse_net_dev(&content, Instant::now()))
}

/// Current counters for one interface
pub fn read_interface_stats(name: &str) -> Result<InterfaceStats, ProcNetError> {
    read_net_dev()?
        .remove(name)
        .ok_or_else(|| ProcNetError::InterfaceNotFound(name.to_string()))
}

/// Interface names from `/proc/net/dev` text, in file order, without loopback
pub fn interface_names(content: &str) -> Vec<String> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty() && name != LOOPBACK)
        .collect()
}

/// Names of the host's non-loopback interfaces
pub fn detect_interfaces() -> Result<Vec<String>, ProcNetError> {
    let content = read_proc_file(PROC_NET_DEV)?;
    Ok(interface_names(&content))
}

/// Bandwidth between two snapshots of the same interface
///
/// A non-positive interval yields zero. Counters that went backwards
/// (interface reset, wrap) count as zero bytes.
pub fn calculate_bandwidth(prev: &InterfaceStats, current: &InterfaceStats) -> Bandwidth {
    let elapsed = current
        .timestamp
        .saturating_duration_since(prev.timestamp)
        .as_secs_f64();
    if elapsed <= 0.0 {
        return Bandwidth::default();
    }

    let rx = current.rx_bytes.saturating_sub(prev.rx_bytes);
    let tx = current.tx_bytes.saturating_sub(prev.tx_bytes);

    Bandwidth {
        download_bps: (rx as f64 * 8.0) / elapsed,
        upload_bps: (tx as f64 * 8.0) / elapsed,
    }
}

/// Sample an interface twice, `window` apart, and return its bandwidth
pub fn measure_bandwidth(name: &str, window: Duration) -> Result<Bandwidth, ProcNetError> {
    let first = read_interface_stats(name)?;
    thread::sleep(window);
    let second = read_interface_stats(name)?;
    Ok(calculate_bandwidth(&first, &second))
}

/// Human-readable rate: Mbps above 1e6, Kbps above 1e3, else bps
pub fn format_bps(bps: f64) -> String {
    if bps > 1_000_000.0 {
        format!("{:.2} Mbps", bps / 1_000_000.0)
    } else if bps > 1_000.0 {
        format!("{:.2} Kbps", bps / 1_000.0)
    } else {
        format!("{:.2} bps", bps)
    }
}
