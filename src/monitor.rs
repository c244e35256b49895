//! Continuous bandwidth monitoring loop.

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;

use crate::export::{BandwidthRecord, append_record, format_monitor_line};
use crate::procnet::{InterfaceStats, ProcNetError, calculate_bandwidth, read_interface_stats};

/// Default time between samples
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Same layout as ctime(3), without the trailing newline
const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Time between samples
    pub interval: Duration,
    /// CSV log to append each sample to
    pub log_file: Option<PathBuf>,
    /// Stop after this many samples (None = until interrupted or a read fails)
    pub samples: Option<u64>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_MONITOR_INTERVAL,
            log_file: None,
            samples: None,
        }
    }
}

/// Print one bandwidth line per interval for `interface`
pub fn monitor_bandwidth<W: Write>(
    interface: &str,
    options: &MonitorOptions,
    out: W,
) -> Result<()> {
    monitor_with(interface, options, || read_interface_stats(interface), out)
}

/// Monitor loop over an arbitrary snapshot source
pub fn monitor_with<F, W>(
    interface: &str,
    options: &MonitorOptions,
    mut read: F,
    mut out: W,
) -> Result<()>
where
    F: FnMut() -> Result<InterfaceStats, ProcNetError>,
    W: Write,
{
    let mut prev = read().with_context(|| format!("Unable to read interface {}", interface))?;
    info!(
        "monitoring {} every {:?}{}",
        interface,
        options.interval,
        options
            .log_file
            .as_ref()
            .map(|p| format!(", logging to {}", p.display()))
            .unwrap_or_default()
    );

    let mut taken = 0u64;
    while options.samples.is_none_or(|limit| taken < limit) {
        thread::sleep(options.interval);

        let current = read().context("Error reading interface stats")?;
        let bandwidth = calculate_bandwidth(&prev, &current);
        let time = Local::now().format(CTIME_FORMAT).to_string();
        writeln!(out, "{}", format_monitor_line(&time, interface, &bandwidth))?;
        out.flush()?;

        if let Some(ref path) = options.log_file {
            append_record(
                path,
                &BandwidthRecord {
                    timestamp: Utc::now(),
                    interface: interface.to_string(),
                    bandwidth,
                },
            )?;
        }

        prev = current;
        taken += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn snapshots(rx_steps: &[u64]) -> impl FnMut() -> Result<InterfaceStats, ProcNetError> {
        let start = Instant::now();
        let steps: Vec<u64> = rx_steps.to_vec();
        let mut i = 0usize;
        move || {
            let rx = *steps
                .get(i)
                .ok_or_else(|| ProcNetError::InterfaceNotFound("eth0".into()))?;
            let stats = InterfaceStats {
                name: "eth0".into(),
                rx_bytes: rx,
                rx_packets: 0,
                tx_bytes: 0,
                tx_packets: 0,
                timestamp: start + Duration::from_secs(i as u64),
            };
            i += 1;
            Ok(stats)
        }
    }

    #[test]
    fn test_monitor_prints_each_sample() {
        let options = MonitorOptions {
            interval: Duration::ZERO,
            log_file: None,
            samples: Some(2),
        };
        let mut out = Vec::new();
        monitor_with("eth0", &options, snapshots(&[0, 1_000, 3_000]), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("eth0 - \u{2193} 8.00 Kbps | \u{2191} 0.00 bps"));
        assert!(lines[1].ends_with("eth0 - \u{2193} 16.00 Kbps | \u{2191} 0.00 bps"));
    }

    #[test]
    fn test_monitor_stops_on_read_error() {
        let options = MonitorOptions {
            interval: Duration::ZERO,
            log_file: None,
            samples: None,
        };
        let mut out = Vec::new();
        let err = monitor_with("eth0", &options, snapshots(&[0, 1_000]), &mut out).unwrap_err();
        assert!(err.to_string().contains("Error reading interface stats"));
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_monitor_initial_read_failure() {
        let options = MonitorOptions::default();
        let err = monitor_with("eth0", &options, snapshots(&[]), Vec::new()).unwrap_err();
        assert!(err.to_string().contains("Unable to read interface eth0"));
    }

    #[test]
    fn test_monitor_logs_samples() {
        let path = std::env::temp_dir().join(format!("netmon-monitor-{}.csv", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let options = MonitorOptions {
            interval: Duration::ZERO,
            log_file: Some(path.clone()),
            samples: Some(2),
        };
        monitor_with("eth0", &options, snapshots(&[0, 125, 250]), Vec::new()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "timestamp,interface,download_bps,upload_bps");
        assert!(lines[1].ends_with(",eth0,1000.00,0.00"));
        std::fs::remove_file(&path).unwrap();
    }
}
