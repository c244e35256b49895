use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::procnet::{Bandwidth, ConnectionStats};
use crate::state::{LatencyResult, PacketLossStats};

/// Timestamp format for the first column of every log
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A row type that can be appended to a CSV log
pub trait CsvRecord {
    /// Header line (without newline)
    const HEADER: &'static str;

    /// One data row (without newline), fields already escaped
    fn row(&self) -> String;
}

/// Bandwidth sample for one interface
#[derive(Debug, Clone)]
pub struct BandwidthRecord {
    pub timestamp: DateTime<Utc>,
    pub interface: String,
    pub bandwidth: Bandwidth,
}

/// One latency probe
#[derive(Debug, Clone)]
pub struct LatencyRecord {
    pub timestamp: DateTime<Utc>,
    pub result: LatencyResult,
}

/// One packet loss run
#[derive(Debug, Clone)]
pub struct PacketLossRecord {
    pub timestamp: DateTime<Utc>,
    pub stats: PacketLossStats,
}

/// Socket totals at one point in time
#[derive(Debug, Clone)]
pub struct ConnectionRecord {
    pub timestamp: DateTime<Utc>,
    pub stats: ConnectionStats,
}

impl CsvRecord for BandwidthRecord {
    const HEADER: &'static str = "timestamp,interface,download_bps,upload_bps";

    fn row(&self) -> String {
        format!(
            "{},{},{:.2},{:.2}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            escape_csv(&self.interface),
            self.bandwidth.download_bps,
            self.bandwidth.upload_bps
        )
    }
}

impl CsvRecord for LatencyRecord {
    const HEADER: &'static str = "timestamp,host,success,rtt_ms,failure";

    fn row(&self) -> String {
        format!(
            "{},{},{},{:.3},{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            escape_csv(&self.result.host),
            self.result.success,
            self.result.rtt_ms,
            self.result
                .failure
                .map(|f| f.to_string())
                .unwrap_or_default()
        )
    }
}

impl CsvRecord for PacketLossRecord {
    const HEADER: &'static str =
        "timestamp,host,sent,received,loss_pct,min_ms,max_ms,avg_ms,jitter_ms";

    fn row(&self) -> String {
        let s = &self.stats;
        format!(
            "{},{},{},{},{:.1},{:.3},{:.3},{:.3},{:.3}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            escape_csv(&s.host),
            s.sent,
            s.received,
            s.loss_pct,
            s.min_rtt_ms,
            s.max_rtt_ms,
            s.avg_rtt_ms,
            s.jitter_ms
        )
    }
}

impl CsvRecord for ConnectionRecord {
    const HEADER: &'static str = "timestamp,tcp_total,tcp_established,udp_total";

    fn row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.stats.tcp_total,
            self.stats.tcp_established,
            self.stats.udp_total
        )
    }
}

/// Write `record`, preceded by the header when `with_header` is set
pub fn write_record<R: CsvRecord, W: Write>(
    record: &R,
    with_header: bool,
    mut writer: W,
) -> Result<()> {
    if with_header {
        writeln!(writer, "{}", R::HEADER)?;
    }
    writeln!(writer, "{}", record.row())?;
    Ok(())
}

/// Append `record` to the CSV log at `path`
///
/// The file is created if missing; the header is written only into an
/// empty file.
pub fn append_record<R: CsvRecord>(path: &Path, record: &R) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let is_empty = file
        .metadata()
        .with_context(|| format!("Failed to read log file metadata: {}", path.display()))?
        .len()
        == 0;

    write_record(record, is_empty, &file)
        .with_context(|| format!("Failed to write log file: {}", path.display()))
}

/// Escape a string for CSV (quote if contains comma, quote, or newline)
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
