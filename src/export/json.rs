use anyhow::Result;
use serde::Serialize;
use std::io::Write;

/// Export any result record as pretty-printed JSON
pub fn export_json<T: Serialize, W: Write>(value: &T, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeFailure;
    use crate::state::{LatencyResult, PacketLossStats};

    #[test]
    fn test_export_latency() {
        let mut buf = Vec::new();
        export_json(&LatencyResult::failed("x", ProbeFailure::Resolution), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["rtt_ms"], 0.0);
        assert_eq!(value["failure"], "resolution");
    }

    #[test]
    fn test_export_loss_is_finite() {
        let mut buf = Vec::new();
        export_json(&PacketLossStats::from_samples("x", 5, &[]), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["loss_pct"], 100.0);
        assert_eq!(value["jitter_ms"], 0.0);
    }
}
