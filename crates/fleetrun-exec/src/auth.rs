//! Authentication resolution
//!
//! Picks the credential for one host deterministically, first available
//! wins: explicit identity override, then the identity resolved from the
//! SSH client config, then default identity discovery under `~/.ssh`,
//! then the password fallback when one is configured.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ExecError;

/// Default identity files probed under `~/.ssh`, in order
const DEFAULT_IDENTITIES: &[&str] = &["id_ed25519", "id_rsa"];

/// Shared authentication inputs for a run
#[derive(Debug, Clone, Default)]
pub struct AuthOptions {
    /// Explicit identity file, wins over everything
    pub identity_file: Option<PathBuf>,
    /// Password fallback, used only when no key material is found
    pub password: Option<String>,
}

/// Resolved credential for one connection
#[derive(Clone)]
pub enum AuthMethod {
    /// Private key file
    Key(PathBuf),
    /// Password authentication
    Password(String),
}

impl std::fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Key(path) => f.debug_tuple("Key").field(path).finish(),
            AuthMethod::Password(_) => f.debug_tuple("Password").field(&"<redacted>").finish(),
        }
    }
}

/// Resolves the authentication method for hosts in a run
#[derive(Debug, Clone)]
pub struct AuthResolver {
    options: AuthOptions,
    home: Option<PathBuf>,
}

impl AuthResolver {
    /// Create a resolver using the process home directory for discovery
    #[must_use]
    pub fn new(options: AuthOptions) -> Self {
        Self {
            options,
            home: std::env::var_os("HOME").map(PathBuf::from),
        }
    }

    /// Override the home directory used for default identity discovery
    #[must_use]
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Resolve the credential for one host
    ///
    /// `config_identity` is the per-host identity file from the SSH client
    /// config, if any.
    ///
    /// # Errors
    /// `ExecError::Key` if the explicit identity file is unusable,
    /// `ExecError::NoAuthMethod` if no credential source yields anything.
    pub fn resolve(&self, config_identity: Option<&Path>) -> Result<AuthMethod, ExecError> {
        // Explicit override must be usable; a broken path here is an
        // operator mistake, not something to silently fall through.
        if let Some(path) = &self.options.identity_file {
            validate_key_file(path)?;
            debug!(path = %path.display(), "using explicit identity file");
            return Ok(AuthMethod::Key(path.clone()));
        }

        if let Some(path) = config_identity {
            match validate_key_file(path) {
                Ok(()) => {
                    debug!(path = %path.display(), "using identity from ssh config");
                    return Ok(AuthMethod::Key(path.to_path_buf()));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring unusable config identity");
                }
            }
        }

        if let Some(home) = &self.home {
            for name in DEFAULT_IDENTITIES {
                let candidate = home.join(".ssh").join(name);
                if validate_key_file(&candidate).is_ok() {
                    debug!(path = %candidate.display(), "using discovered identity file");
                    return Ok(AuthMethod::Key(candidate));
                }
            }
        }

        if let Some(password) = &self.options.password {
            debug!("falling back to password authentication");
            return Ok(AuthMethod::Password(password.clone()));
        }

        Err(ExecError::NoAuthMethod(
            "no identity file found and no password configured".to_string(),
        ))
    }
}

/// Check that a key file exists and is not world/group readable
fn validate_key_file(path: &Path) -> Result<(), ExecError> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)
        .map_err(|e| ExecError::Key(format!("{}: {e}", path.display())))?;

    let mode = metadata.permissions().mode();
    // mode & 0o77 checks group and other permissions
    if mode & 0o77 != 0 {
        return Err(ExecError::Key(format!(
            "key file permissions too open: {} (should be 600)",
            path.display()
        )));
    }

    Ok(())
}
