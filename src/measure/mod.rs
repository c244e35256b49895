//! ICMP echo measurements.
//!
//! Both measurers drive an [`EchoSession`] over a [`ProbeTransport`]: the
//! single-probe latency measurer sends one request, the loss engine sends a
//! numbered series over one socket and reduces the RTTs.
//!
//! [`ProbeTransport`]: crate::probe::ProbeTransport

pub mod latency;
pub mod loss;
pub mod session;

pub use latency::*;
pub use loss::*;
pub use session::*;

use std::time::Duration;

use crate::probe::{DEFAULT_PAYLOAD_SIZE, get_identifier};

/// Default receive deadline per probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
/// Default delay between probes in a loss run
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_millis(100);
/// Default number of probes in a loss run
pub const DEFAULT_PROBE_COUNT: u32 = 10;

/// What to do with a datagram that is not the awaited reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    /// The first datagram decides the probe (non-matching = failed/lost)
    #[default]
    FirstReply,
    /// Discard non-matching datagrams and keep waiting until the deadline
    UntilDeadline,
}

/// Knobs shared by both measurers
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    /// Receive deadline for each probe
    pub timeout: Duration,
    /// Delay between consecutive probes (loss runs only)
    pub interval: Duration,
    /// ICMP payload size in bytes
    pub payload_size: usize,
    pub match_policy: MatchPolicy,
    /// ICMP identifier for this process
    pub identifier: u16,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            interval: DEFAULT_PROBE_INTERVAL,
            payload_size: DEFAULT_PAYLOAD_SIZE,
            match_policy: MatchPolicy::FirstReply,
            identifier: get_identifier(),
        }
    }
}
