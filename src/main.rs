use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use serde::Serialize;
use std::io::{self, Write};
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use netmon::cli::{Args, Mode, usage};
use netmon::config::Config;
use netmon::export::csv::{
    BandwidthRecord, ConnectionRecord, CsvRecord, LatencyRecord, PacketLossRecord, append_record,
};
use netmon::export::json::export_json;
use netmon::export::report::{
    write_bandwidth, write_connections, write_interfaces, write_latency, write_packet_loss,
};
use netmon::measure::{detect_packet_loss_with, measure_latency_with};
use netmon::monitor::monitor_bandwidth;
use netmon::probe::{ProbeFailure, permission_hint};
use netmon::procnet::{
    ConnectionStats, SocketEntry, connection_stats, detect_interfaces, list_connections,
    measure_bandwidth,
};

/// Window for a single bandwidth reading
const BANDWIDTH_WINDOW: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // Bare invocation shows usage and succeeds
    if std::env::args_os().len() <= 1 {
        print!("{}", usage());
        return Ok(());
    }

    let args = Args::parse();
    init_logging(args.verbose);

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    let config = Config::from(&args);
    let Some(mode) = args.mode() else {
        anyhow::bail!("No mode specified");
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match mode {
        Mode::List => {
            let interfaces = detect_interfaces().context("Unable to list network interfaces")?;
            write_interfaces(&interfaces, &mut out)?;
        }
        Mode::Bandwidth(interface) => {
            let bandwidth = measure_bandwidth(&interface, BANDWIDTH_WINDOW)
                .with_context(|| format!("Unable to measure bandwidth of {}", interface))?;
            write_bandwidth(&interface, &bandwidth, &mut out)?;
            log_record(
                &config,
                &BandwidthRecord {
                    timestamp: Utc::now(),
                    interface,
                    bandwidth,
                },
            );
        }
        Mode::Monitor(interface) => {
            monitor_bandwidth(&interface, &config.monitor_options(), &mut out)?;
        }
        Mode::Latency(host) => {
            let result = measure_latency_with(&host, &config.latency_options());
            if config.json {
                export_json(&result, &mut out)?;
            } else {
                write_latency(&result, &mut out)?;
            }
            if result.failure == Some(ProbeFailure::Transport) {
                eprintln!("{}", permission_hint());
            }
            log_record(
                &config,
                &LatencyRecord {
                    timestamp: Utc::now(),
                    result,
                },
            );
        }
        Mode::PacketLoss(host) => {
            let stats = detect_packet_loss_with(&host, config.count, &config.loss_options());
            if config.json {
                export_json(&stats, &mut out)?;
            } else {
                write_packet_loss(&stats, &mut out)?;
            }
            if stats.failure == Some(ProbeFailure::Transport) {
                eprintln!("{}", permission_hint());
            }
            log_record(
                &config,
                &PacketLossRecord {
                    timestamp: Utc::now(),
                    stats,
                },
            );
        }
        Mode::Connections => {
            let entries = list_connections().context("Unable to read socket tables")?;
            let stats = connection_stats(&entries);
            if config.json {
                export_json(&ConnectionsReport { stats, connections: &entries }, &mut out)?;
            } else {
                write_connections(&stats, &entries, &mut out)?;
            }
            log_record(
                &config,
                &ConnectionRecord {
                    timestamp: Utc::now(),
                    stats,
                },
            );
        }
    }

    out.flush()?;
    Ok(())
}

/// JSON shape of the connections view
#[derive(Serialize)]
struct ConnectionsReport<'a> {
    stats: ConnectionStats,
    connections: &'a [SocketEntry],
}

/// Map -v count to a level; RUST_LOG overrides when set
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .compact()
        .init();
}

/// Append to the CSV log if one was requested; failures only warn
fn log_record<R: CsvRecord>(config: &Config, record: &R) {
    if let Some(ref path) = config.log_file
        && let Err(e) = append_record(path, record)
    {
        eprintln!("Warning: {:#}", e);
    }
}
