// Public API - measurement, procfs readers, and result types
pub mod export;
pub mod measure;
pub mod monitor;
pub mod probe;
pub mod procnet;
pub mod state;

// CLI plumbing
pub mod cli;
pub mod config;
