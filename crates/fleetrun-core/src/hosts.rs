//! Host list parsing and `HostSpec` resolution

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use fleetrun_exec::ConnectionInfo;

use crate::error::CoreError;
use crate::ssh_config::ConfigResolver;

/// One entry from the host list, before resolution
///
/// `user` is set only when the line used the `user@host` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostLine {
    pub user: Option<String>,
    pub host: String,
}

/// Explicit run-time overrides; these win over every other source
#[derive(Debug, Clone, Default)]
pub struct HostOverrides {
    /// Username override
    pub user: Option<String>,
}

/// Resolved identity of one target host
///
/// Immutable once constructed. Built by merging, highest precedence
/// first: run-time overrides, the `user@host` line form, SSH-config
/// resolution, defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    /// Alias as written in the host list (without any `user@` prefix)
    pub alias: String,
    /// Username, if any source supplied one
    pub user: Option<String>,
    /// Hostname to connect to (config `HostName` or the alias itself)
    pub hostname: String,
    /// Port
    pub port: u16,
    /// Identity file resolved from the SSH config, if any
    pub identity_file: Option<PathBuf>,
}

impl HostSpec {
    /// Resolve one host line against overrides and the SSH config
    pub fn resolve(
        line: &HostLine,
        overrides: &HostOverrides,
        config: &dyn ConfigResolver,
    ) -> Self {
        let params = config.lookup(&line.host);

        let user = overrides
            .user
            .clone()
            .or_else(|| line.user.clone())
            .or_else(|| params.user.clone());

        let spec = Self {
            alias: line.host.clone(),
            user,
            hostname: params.hostname.unwrap_or_else(|| line.host.clone()),
            port: params.port.unwrap_or(22),
            identity_file: params.identity_file,
        };

        debug!(
            alias = %spec.alias,
            hostname = %spec.hostname,
            port = spec.port,
            user = ?spec.user,
            "resolved host"
        );

        spec
    }

    /// Connection parameters for the transport layer
    ///
    /// The username default (`$USER`, then `root`) is applied here so
    /// that resolution itself stays deterministic.
    #[must_use]
    pub fn connection_info(&self) -> ConnectionInfo {
        let user = self.user.clone().unwrap_or_else(default_user);
        ConnectionInfo::new(&self.hostname, user).with_port(self.port)
    }
}

fn default_user() -> String {
    std::env::var("USER").unwrap_or_else(|_| "root".to_string())
}

/// Parse one line of the host list
///
/// Blank lines and `#` comments yield `None`; anything else is a host
/// entry, optionally in `user@host` form.
#[must_use]
pub fn parse_host_line(line: &str) -> Option<HostLine> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    match line.split_once('@') {
        Some((user, host)) if !user.is_empty() && !host.is_empty() => Some(HostLine {
            user: Some(user.to_string()),
            host: host.to_string(),
        }),
        Some((_, host)) if !host.is_empty() => Some(HostLine {
            user: None,
            host: host.to_string(),
        }),
        Some(_) => None,
        None => Some(HostLine {
            user: None,
            host: line.to_string(),
        }),
    }
}

/// Read the host list file
///
/// Duplicate entries are kept: they produce duplicate tasks, never
/// merged.
///
/// # Errors
/// `HostsFile` if the file cannot be read, `NoHosts` if it parses to
/// zero entries; both are fatal to the run.
pub fn read_hosts_file(path: &Path) -> Result<Vec<HostLine>, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| CoreError::HostsFile {
        path: path.to_path_buf(),
        source,
    })?;

    let hosts: Vec<HostLine> = content.lines().filter_map(parse_host_line).collect();

    if hosts.is_empty() {
        return Err(CoreError::NoHosts {
            path: path.to_path_buf(),
        });
    }

    Ok(hosts)
}

/// Resolve every host line into a `HostSpec`
#[must_use]
pub fn resolve_hosts(
    lines: &[HostLine],
    overrides: &HostOverrides,
    config: &dyn ConfigResolver,
) -> Vec<HostSpec> {
    lines
        .iter()
        .map(|line| HostSpec::resolve(line, overrides, config))
        .collect()
}
