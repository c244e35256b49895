use clap::{CommandFactory, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::measure::{DEFAULT_PROBE_COUNT, DEFAULT_PROBE_TIMEOUT};
use crate::monitor::DEFAULT_MONITOR_INTERVAL;
use crate::probe::DEFAULT_PAYLOAD_SIZE;

/// Network performance monitor: bandwidth, ICMP latency, packet loss, and connections
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "netmon")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// List available network interfaces
    #[arg(short = 'l', long = "list")]
    pub list: bool,

    /// Measure bandwidth of an interface (single reading)
    #[arg(short = 'i', long = "interface", value_name = "NAME")]
    pub interface: Option<String>,

    /// Continuously monitor bandwidth of an interface
    #[arg(short = 'm', long = "monitor", value_name = "NAME")]
    pub monitor: Option<String>,

    /// Monitoring interval in seconds
    #[arg(short = 't', long = "interval", default_value_t = DEFAULT_MONITOR_INTERVAL.as_secs())]
    pub interval: u64,

    /// Stop monitoring after this many samples
    #[arg(long = "samples")]
    pub samples: Option<u64>,

    /// Measure ICMP latency to a host (one probe)
    #[arg(short = 'p', long = "ping", value_name = "HOST")]
    pub ping: Option<String>,

    /// Reply timeout in milliseconds
    #[arg(long = "timeout", default_value_t = DEFAULT_PROBE_TIMEOUT.as_millis() as u64)]
    pub timeout: u64,

    /// Measure packet loss and jitter to a host
    #[arg(short = 'L', long = "loss", value_name = "HOST")]
    pub loss: Option<String>,

    /// Number of probes for packet loss detection
    #[arg(short = 'c', long = "count", default_value_t = DEFAULT_PROBE_COUNT)]
    pub count: u32,

    /// ICMP payload size in bytes
    #[arg(long = "payload-size", default_value_t = DEFAULT_PAYLOAD_SIZE)]
    pub payload_size: usize,

    /// Keep waiting for the matching reply until the timeout instead of
    /// failing on the first unrelated ICMP packet
    #[arg(long = "wait-match")]
    pub wait_match: bool,

    /// Show active TCP/UDP connections
    #[arg(short = 'C', long = "connections")]
    pub connections: bool,

    /// Append results to a CSV log file
    #[arg(long = "log", value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Output JSON instead of text (latency, loss, connections)
    #[arg(long = "json")]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Operating mode selected on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    List,
    Bandwidth(String),
    Monitor(String),
    Latency(String),
    PacketLoss(String),
    Connections,
}

/// Mode-selecting flags, for validation messages
const MODE_FLAGS: &str = "--list, --interface, --monitor, --ping, --loss, --connections";

/// Upper bound on probes per run (ICMP sequence numbers are 16 bits)
const MAX_COUNT: u32 = u16::MAX as u32;

/// Largest ICMP payload that fits an unfragmented 1500 byte IPv4 packet
const MAX_PAYLOAD_SIZE: usize = 1472;

/// Rendered `--help` text, shown when netmon is run without arguments
pub fn usage() -> String {
    Args::command().render_help().to_string()
}

impl Args {
    /// Get monitoring interval as Duration
    pub fn interval_duration(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Get reply timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    fn modes(&self) -> Vec<Mode> {
        let mut modes = Vec::new();
        if self.list {
            modes.push(Mode::List);
        }
        if let Some(ref name) = self.interface {
            modes.push(Mode::Bandwidth(name.clone()));
        }
        if let Some(ref name) = self.monitor {
            modes.push(Mode::Monitor(name.clone()));
        }
        if let Some(ref host) = self.ping {
            modes.push(Mode::Latency(host.clone()));
        }
        if let Some(ref host) = self.loss {
            modes.push(Mode::PacketLoss(host.clone()));
        }
        if self.connections {
            modes.push(Mode::Connections);
        }
        modes
    }

    /// The single selected mode (call after `validate`)
    pub fn mode(&self) -> Option<Mode> {
        self.modes().into_iter().next()
    }

    /// Validate arguments
    pub fn validate(&self) -> Result<(), String> {
        match self.modes().len() {
            0 => return Err(format!("No mode specified. Use one of {}", MODE_FLAGS)),
            1 => {}
            _ => return Err(format!("Only one of {} may be given", MODE_FLAGS)),
        }

        if self.interval == 0 {
            return Err("Interval must be a positive integer".into());
        }

        if self.timeout == 0 {
            return Err("Timeout must be positive".into());
        }

        if self.count == 0 {
            return Err("Count must be at least 1".into());
        }
        if self.count > MAX_COUNT {
            return Err(format!("Count cannot exceed {}", MAX_COUNT));
        }

        if self.payload_size > MAX_PAYLOAD_SIZE {
            return Err(format!("Payload size cannot exceed {} bytes", MAX_PAYLOAD_SIZE));
        }

        if self.samples == Some(0) {
            return Err("Samples must be at least 1".into());
        }

        // Validate interface names
        for iface in [&self.interface, &self.monitor].into_iter().flatten() {
            if iface.is_empty() {
                return Err("Interface name cannot be empty".into());
            }
            // IFNAMSIZ on Linux is 16 including null terminator
            if iface.len() > 15 {
                return Err(format!("Interface name too long: {} (max 15 chars)", iface));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("netmon").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--list"]);
        assert_eq!(args.interval, 1);
        assert_eq!(args.timeout, 1000);
        assert_eq!(args.count, 10);
        assert_eq!(args.payload_size, 56);
        assert_eq!(args.timeout_duration(), Duration::from_secs(1));
        assert!(args.validate().is_ok());
        assert_eq!(args.mode(), Some(Mode::List));
    }

    #[test]
    fn test_modes() {
        assert_eq!(parse(&["-i", "eth0"]).mode(), Some(Mode::Bandwidth("eth0".into())));
        assert_eq!(
            parse(&["-m", "wlan0", "-t", "2"]).mode(),
            Some(Mode::Monitor("wlan0".into()))
        );
        assert_eq!(parse(&["-p", "8.8.8.8"]).mode(), Some(Mode::Latency("8.8.8.8".into())));
        assert_eq!(
            parse(&["-L", "example.com", "-c", "5"]).mode(),
            Some(Mode::PacketLoss("example.com".into()))
        );
        assert_eq!(parse(&["-C"]).mode(), Some(Mode::Connections));
    }

    #[test]
    fn test_no_arguments_parses_without_a_mode() {
        // main prints usage and exits 0 in this case
        let args = Args::try_parse_from(["netmon"]).unwrap();
        assert_eq!(args.mode(), None);
        assert!(args.validate().is_err());
        assert!(Args::default().validate().is_err());
    }

    #[test]
    fn test_usage_lists_modes() {
        let text = usage();
        for flag in ["--list", "--interface", "--monitor", "--ping", "--loss", "--connections"] {
            assert!(text.contains(flag), "usage is missing {}", flag);
        }
    }

    #[test]
    fn test_conflicting_modes() {
        let args = parse(&["--list", "--ping", "1.1.1.1"]);
        assert!(args.validate().unwrap_err().contains("Only one"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse(&["-m", "eth0", "-t", "0"]).validate().is_err());
        assert!(parse(&["-p", "h", "--timeout", "0"]).validate().is_err());
        assert!(parse(&["-L", "h", "-c", "0"]).validate().is_err());
        assert!(parse(&["-L", "h", "-c", "70000"]).validate().is_err());
        assert!(parse(&["-p", "h", "--payload-size", "2000"]).validate().is_err());
        assert!(parse(&["-m", "eth0", "--samples", "0"]).validate().is_err());
        assert!(parse(&["-i", "averyveryverylongname"]).validate().is_err());
        assert!(parse(&["-i", ""]).validate().is_err());
    }

    #[test]
    fn test_negative_interval_rejected_by_parser() {
        assert!(Args::try_parse_from(["netmon", "-m", "eth0", "-t", "-1"]).is_err());
    }
}
