use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::probe::ProbeFailure;

/// Outcome of a single echo round trip
///
/// `rtt_ms` is only meaningful when `success` is true; on failure it is 0
/// and `failure` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyResult {
    pub host: String,
    pub success: bool,
    pub rtt_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
}

impl LatencyResult {
    pub fn success(host: impl Into<String>, rtt: Duration) -> Self {
        Self {
            host: host.into(),
            success: true,
            rtt_ms: duration_ms(rtt),
            failure: None,
        }
    }

    pub fn failed(host: impl Into<String>, failure: ProbeFailure) -> Self {
        Self {
            host: host.into(),
            success: false,
            rtt_ms: 0.0,
            failure: Some(failure),
        }
    }
}

/// Aggregate of one packet loss run
///
/// All RTT fields are milliseconds and are 0.0 when nothing was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketLossStats {
    pub host: String,
    pub sent: u32,
    pub received: u32,
    pub loss_pct: f64,
    pub min_rtt_ms: f64,
    pub max_rtt_ms: f64,
    pub avg_rtt_ms: f64,
    /// Population standard deviation of the received RTTs
    pub jitter_ms: f64,
    /// Set when the run could not start at all
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ProbeFailure>,
}

impl PacketLossStats {
    /// Reduce the RTT samples (ms) of the matched replies out of `sent` probes
    pub fn from_samples(host: impl Into<String>, sent: u32, rtts_ms: &[f64]) -> Self {
        let received = rtts_ms.len() as u32;
        let mut stats = Self {
            host: host.into(),
            sent,
            received,
            loss_pct: 100.0,
            min_rtt_ms: 0.0,
            max_rtt_ms: 0.0,
            avg_rtt_ms: 0.0,
            jitter_ms: 0.0,
            failure: None,
        };

        if received == 0 || sent == 0 {
            return stats;
        }

        stats.loss_pct = (sent.saturating_sub(received)) as f64 / sent as f64 * 100.0;

        let n = rtts_ms.len() as f64;
        let mean = rtts_ms.iter().sum::<f64>() / n;
        stats.min_rtt_ms = rtts_ms.iter().copied().fold(f64::INFINITY, f64::min);
        stats.max_rtt_ms = rtts_ms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        stats.avg_rtt_ms = mean;

        if rtts_ms.len() > 1 {
            let variance = rtts_ms.iter().map(|rtt| (rtt - mean).powi(2)).sum::<f64>() / n;
            stats.jitter_ms = variance.sqrt();
        }

        stats
    }

    /// Stats for a run that never got to send anything
    pub fn failed(host: impl Into<String>, failure: ProbeFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Self::from_samples(host, 0, &[])
        }
    }
}

/// Duration as fractional milliseconds (nanosecond resolution)
pub fn duration_ms(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}
