//! Structured run results

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one command on one host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// The command that was executed
    pub command: String,
    /// Exit status code
    pub exit_code: i32,
    /// Raw stdout
    pub stdout: String,
    /// Raw stderr
    pub stderr: String,
    /// Structured record produced by the executor's parser
    pub parsed: serde_json::Value,
    /// Whether the command exited with code 0
    pub success: bool,
    /// Time taken to execute
    pub duration: Duration,
}

/// Outcome of one host's full command sequence
///
/// Exactly one per submitted host, immutable once the task completes.
/// `success` reflects transport-level completion; individual exit codes
/// are carried in `commands` as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostResult {
    /// Host identity as submitted
    pub host: String,
    /// Overall success flag
    pub success: bool,
    /// Error description when the host failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Per-command results, in declared command order
    pub commands: Vec<CommandResult>,
}

impl HostResult {
    /// Result for a host that failed before or during execution,
    /// keeping whatever partial command results were collected
    #[must_use]
    pub fn failed(host: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            success: false,
            error: Some(error.into()),
            commands: Vec::new(),
        }
    }
}

/// Aggregate of all host results for one run
///
/// Hosts appear in submission order regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of hosts submitted
    pub total_hosts: usize,
    /// Number of hosts with `success == true`
    pub successful_hosts: usize,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the last host task finished
    pub finished_at: DateTime<Utc>,
    /// Per-host results in submission order
    pub hosts: Vec<HostResult>,
}

impl RunReport {
    /// Assemble a report from per-host results in submission order
    #[must_use]
    pub fn new(hosts: Vec<HostResult>, started_at: DateTime<Utc>) -> Self {
        let successful_hosts = hosts.iter().filter(|h| h.success).count();
        Self {
            total_hosts: hosts.len(),
            successful_hosts,
            started_at,
            finished_at: Utc::now(),
            hosts,
        }
    }

    /// Whether every host succeeded
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.successful_hosts == self.total_hosts
    }
}
