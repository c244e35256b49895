use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::measure::{
    DEFAULT_PROBE_COUNT, DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT, MatchPolicy, ProbeOptions,
};
use crate::monitor::{DEFAULT_MONITOR_INTERVAL, MonitorOptions};
use crate::probe::{DEFAULT_PAYLOAD_SIZE, get_identifier};

/// Runtime configuration derived from CLI args
#[derive(Debug, Clone)]
pub struct Config {
    /// Reply timeout for a single latency probe
    pub timeout: Duration,
    /// Number of probes for packet loss detection
    pub count: u32,
    /// Receive deadline for each probe of a loss run
    pub probe_timeout: Duration,
    /// Delay between probes of a loss run
    pub probe_interval: Duration,
    /// ICMP payload size
    pub payload_size: usize,
    pub match_policy: MatchPolicy,
    /// Bandwidth monitor interval
    pub interval: Duration,
    /// Bandwidth monitor sample limit
    pub samples: Option<u64>,
    /// CSV log file
    pub log_file: Option<PathBuf>,
    /// JSON output
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            count: DEFAULT_PROBE_COUNT,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            probe_interval: DEFAULT_PROBE_INTERVAL,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            match_policy: MatchPolicy::FirstReply,
            interval: DEFAULT_MONITOR_INTERVAL,
            samples: None,
            log_file: None,
            json: false,
        }
    }
}

impl From<&Args> for Config {
    fn from(args: &Args) -> Self {
        Self {
            timeout: args.timeout_duration(),
            count: args.count,
            payload_size: args.payload_size,
            match_policy: if args.wait_match {
                MatchPolicy::UntilDeadline
            } else {
                MatchPolicy::FirstReply
            },
            interval: args.interval_duration(),
            samples: args.samples,
            log_file: args.log.clone(),
            json: args.json,
            ..Self::default()
        }
    }
}

impl Config {
    /// Options for a single latency probe
    pub fn latency_options(&self) -> ProbeOptions {
        ProbeOptions {
            timeout: self.timeout,
            interval: Duration::ZERO,
            payload_size: self.payload_size,
            match_policy: self.match_policy,
            identifier: get_identifier(),
        }
    }

    /// Options for a packet loss run
    pub fn loss_options(&self) -> ProbeOptions {
        ProbeOptions {
            timeout: self.probe_timeout,
            interval: self.probe_interval,
            payload_size: self.payload_size,
            match_policy: self.match_policy,
            identifier: get_identifier(),
        }
    }

    pub fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval: self.interval,
            log_file: self.log_file.clone(),
            samples: self.samples,
        }
    }
}
