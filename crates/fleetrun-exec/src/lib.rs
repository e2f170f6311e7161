//! fleetrun-exec: SSH transport layer
//!
//! Owns the per-host connection lifecycle: the `ConnectionHandle` state
//! machine, the russh-backed session, authentication resolution, and the
//! injectable diagnostic sink.

pub mod auth;
pub mod connection;
pub mod diag;
pub mod error;
pub mod result;
pub mod ssh;
pub mod state;
pub mod traits;

pub use auth::{AuthMethod, AuthOptions, AuthResolver};
pub use connection::ConnectionHandle;
pub use diag::{DiagEvent, DiagnosticSink, NullSink, TracingSink};
pub use error::ExecError;
pub use result::{CommandOutput, ConnectionInfo};
pub use ssh::SshSession;
pub use state::SessionState;
pub use traits::RemoteSession;
