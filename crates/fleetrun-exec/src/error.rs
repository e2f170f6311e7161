//! Error types for fleetrun-exec

use std::time::Duration;

use thiserror::Error;

use crate::state::SessionState;

/// Errors that can occur while connecting to or executing on a remote host
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Hostname or alias could not be resolved to an address
    #[error("address resolution failed: {0}")]
    Resolution(String),

    /// Credentials were rejected by the remote host
    #[error("authentication failed: {0}")]
    Auth(String),

    /// No response within the connect timeout
    #[error("connection timed out after {timeout:?}")]
    ConnectTimeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Transport-level rejection while connecting
    #[error("connection refused: {0}")]
    Refused(String),

    /// Command did not complete within its timeout
    #[error("command timed out after {timeout:?}")]
    CommandTimeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Session died while a command was in flight
    #[error("channel closed: {0}")]
    ChannelClosed(String),

    /// Operation requires an open session
    #[error("not connected")]
    NotConnected,

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// No usable authentication method could be resolved
    #[error("no authentication method available: {0}")]
    NoAuthMethod(String),

    /// Invalid handle state transition attempted
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: SessionState,
        /// Attempted target state
        to: SessionState,
    },
}

impl ExecError {
    /// True for failures of the connect phase (host never became usable)
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ExecError::Resolution(_)
                | ExecError::Auth(_)
                | ExecError::ConnectTimeout { .. }
                | ExecError::Refused(_)
                | ExecError::Key(_)
                | ExecError::NoAuthMethod(_)
        )
    }

    /// True for failures of an in-flight command (session died or stalled)
    #[must_use]
    pub fn is_execution_error(&self) -> bool {
        matches!(
            self,
            ExecError::CommandTimeout { .. } | ExecError::ChannelClosed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert!(ExecError::Auth("denied".into()).is_connection_error());
        assert!(
            ExecError::ConnectTimeout {
                timeout: Duration::from_secs(10)
            }
            .is_connection_error()
        );
        assert!(ExecError::ChannelClosed("eof".into()).is_execution_error());
        assert!(!ExecError::ChannelClosed("eof".into()).is_connection_error());
        assert!(!ExecError::NotConnected.is_execution_error());
    }
}
