//! Remote session trait

use std::time::Duration;

use async_trait::async_trait;

use crate::auth::AuthMethod;
use crate::error::ExecError;
use crate::result::{CommandOutput, ConnectionInfo};

/// One remote shell session to one host
///
/// `ConnectionHandle` drives implementations through this trait so that
/// tests can substitute a deterministic scripted session for the real SSH
/// transport. Implementations are owned exclusively by one handle; calls
/// are strictly sequential.
#[async_trait]
pub trait RemoteSession: Send {
    /// Open the session
    ///
    /// # Errors
    /// `Resolution`, `Auth`, `ConnectTimeout`, or `Refused` depending on
    /// how the connect attempt failed. On error no resources are held.
    async fn open(
        &mut self,
        info: &ConnectionInfo,
        auth: &AuthMethod,
        timeout: Duration,
    ) -> Result<(), ExecError>;

    /// Run one command on the open session, capturing both output streams
    /// and the exit code
    ///
    /// # Errors
    /// `CommandTimeout` or `ChannelClosed` if the session stalls or dies
    /// mid-command; `NotConnected` if called before `open`.
    async fn run(&mut self, cmd: &str, timeout: Duration) -> Result<CommandOutput, ExecError>;

    /// Release all transport resources; safe to call in any state
    async fn shutdown(&mut self);
}
