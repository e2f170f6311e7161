//! Defaults file loading
//!
//! Optional `fleetrun.toml` supplying defaults for flags the operator
//! does not want to repeat. Flags always win over the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Run defaults loaded from `fleetrun.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Defaults {
    /// Concurrency limit
    pub workers: Option<usize>,
    /// Connection timeout in seconds
    pub connect_timeout_secs: Option<u64>,
    /// Per-command timeout in seconds
    pub command_timeout_secs: Option<u64>,
    /// SSH username
    pub username: Option<String>,
    /// SSH identity file
    pub identity_file: Option<PathBuf>,
    /// Password fallback; only used when no identity file resolves
    pub password: Option<String>,
}

impl Defaults {
    /// Load defaults from a file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let defaults: Defaults = toml::from_str(&content)?;
        Ok(defaults)
    }

    /// Load from default paths or fall back to empty defaults
    ///
    /// # Errors
    /// Returns error only when a file exists but cannot be parsed
    pub fn load_default() -> eyre::Result<Self> {
        // Check environment variable
        if let Ok(path) = std::env::var("FLEETRUN_CONFIG") {
            return Self::load(Path::new(&path));
        }

        // Try common paths
        let paths = [
            PathBuf::from("fleetrun.toml"),
            dirs::config_dir()
                .map(|p| p.join("fleetrun/fleetrun.toml"))
                .unwrap_or_default(),
        ];

        for path in paths {
            if path.exists() {
                return Self::load(&path);
            }
        }

        tracing::debug!("no defaults file found");
        Ok(Defaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_defaults() {
        let defaults: Defaults = toml::from_str(
            "workers = 8\nusername = \"deploy\"\nconnect_timeout_secs = 5\n",
        )
        .unwrap();

        assert_eq!(defaults.workers, Some(8));
        assert_eq!(defaults.username.as_deref(), Some("deploy"));
        assert_eq!(defaults.connect_timeout_secs, Some(5));
        assert_eq!(defaults.identity_file, None);
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let defaults: Defaults = toml::from_str("").unwrap();
        assert_eq!(defaults.workers, None);
        assert_eq!(defaults.password, None);
    }
}
