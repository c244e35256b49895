pub mod icmp;
pub mod resolve;
pub mod socket;

pub use icmp::*;
pub use resolve::*;
pub use socket::*;

use serde::{Deserialize, Serialize};
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Coarse failure category reported in result records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeFailure {
    /// Host could not be resolved to an IPv4 address
    Resolution,
    /// Socket creation, permission, send, or receive error
    Transport,
    /// No reply within the deadline
    Timeout,
    /// Reply too short, corrupt, or not ours
    ProtocolMismatch,
}

impl std::fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProbeFailure::Resolution => "unresolvable host",
            ProbeFailure::Transport => "transport error",
            ProbeFailure::Timeout => "timed out",
            ProbeFailure::ProtocolMismatch => "unexpected reply",
        };
        f.write_str(s)
    }
}

/// Everything that can go wrong with a single probe
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot resolve {host}: {reason}")]
    Resolve { host: String, reason: String },
    #[error("cannot open ICMP socket: {0}")]
    Socket(#[source] io::Error),
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("malformed reply: {0}")]
    Parse(#[from] ParseError),
    #[error("unexpected reply: {0}")]
    Mismatch(#[from] Mismatch),
}

impl ProbeError {
    pub fn failure(&self) -> ProbeFailure {
        match self {
            ProbeError::Resolve { .. } => ProbeFailure::Resolution,
            ProbeError::Socket(_) | ProbeError::Send(_) | ProbeError::Receive(_) => {
                ProbeFailure::Transport
            }
            ProbeError::Timeout(_) => ProbeFailure::Timeout,
            ProbeError::Parse(_) | ProbeError::Mismatch(_) => ProbeFailure::ProtocolMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_mapping() {
        let resolve = ProbeError::Resolve {
            host: "x".into(),
            reason: "nope".into(),
        };
        assert_eq!(resolve.failure(), ProbeFailure::Resolution);
        assert_eq!(
            ProbeError::Socket(io::Error::from(io::ErrorKind::PermissionDenied)).failure(),
            ProbeFailure::Transport
        );
        assert_eq!(
            ProbeError::Timeout(Duration::from_secs(1)).failure(),
            ProbeFailure::Timeout
        );
        assert_eq!(
            ProbeError::from(ParseError::BadChecksum).failure(),
            ProbeFailure::ProtocolMismatch
        );
        assert_eq!(
            ProbeError::from(Mismatch::Identifier {
                expected: 1,
                got: 2
            })
            .failure(),
            ProbeFailure::ProtocolMismatch
        );
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let json = serde_json::to_string(&ProbeFailure::ProtocolMismatch).unwrap();
        assert_eq!(json, "\"protocol_mismatch\"");
    }
}
