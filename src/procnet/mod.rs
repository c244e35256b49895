//! Readers for the kernel's `/proc/net` tables.
//!
//! Parsing is split from file access so every parser can be fed fixture
//! text in tests.

pub mod dev;
pub mod sockets;

pub use dev::*;
pub use sockets::*;

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcNetError {
    #[error("unable to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),
}

pub(crate) fn read_proc_file(path: &str) -> Result<String, ProcNetError> {
    std::fs::read_to_string(path).map_err(|source| ProcNetError::Read {
        path: PathBuf::from(path),
        source,
    })
}
