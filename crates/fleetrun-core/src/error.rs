//! Core error types
//!
//! Only configuration failures live here; per-host connection and
//! execution failures are recovered into the host's result and never
//! surface as errors from the coordinator.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal configuration errors; nothing is scheduled when one occurs
#[derive(Error, Debug)]
pub enum CoreError {
    /// Host list file missing or unreadable
    #[error("failed to read hosts file {path}")]
    HostsFile {
        /// Path that was attempted
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Host list parsed to zero entries
    #[error("no hosts found in {path}")]
    NoHosts {
        /// Path that was read
        path: PathBuf,
    },

    /// Concurrency limit must be positive
    #[error("concurrency limit must be at least 1")]
    ZeroWorkers,
}
