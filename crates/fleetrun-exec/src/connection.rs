//! `ConnectionHandle`: one owned session to one host
//!
//! Wraps a `RemoteSession` with an explicit state machine. A handle is
//! owned by exactly one host task for its whole lifetime and drives the
//! session strictly sequentially.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use crate::auth::AuthMethod;
use crate::diag::{DiagEvent, DiagnosticSink, NullSink};
use crate::error::ExecError;
use crate::result::{CommandOutput, ConnectionInfo};
use crate::state::SessionState;
use crate::traits::RemoteSession;

/// One remote session to one host, with lifecycle tracking
pub struct ConnectionHandle {
    info: ConnectionInfo,
    auth: AuthMethod,
    session: Box<dyn RemoteSession>,
    state: SessionState,
    sink: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("info", &self.info)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ConnectionHandle {
    /// Create a handle in the `Disconnected` state
    pub fn new(info: ConnectionInfo, auth: AuthMethod, session: Box<dyn RemoteSession>) -> Self {
        Self {
            info,
            auth,
            session,
            state: SessionState::Disconnected,
            sink: Arc::new(NullSink),
        }
    }

    /// Attach a diagnostic sink (observability only, no behavior change)
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Connection parameters
    #[must_use]
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.info
    }

    /// Open the session
    ///
    /// # Errors
    /// Connect failures (`Resolution`, `Auth`, `ConnectTimeout`, `Refused`)
    /// move the handle to `Failed`; on failure no resources are held.
    #[instrument(skip(self), fields(host = %self.info.host))]
    pub async fn connect(&mut self, timeout: Duration) -> Result<(), ExecError> {
        self.transition(SessionState::Connecting)?;

        info!(
            host = %self.info.host,
            port = self.info.port,
            user = %self.info.user,
            "connecting"
        );

        match self.session.open(&self.info, &self.auth, timeout).await {
            Ok(()) => {
                self.transition(SessionState::Connected)?;
                info!(host = %self.info.host, "connected and authenticated");
                Ok(())
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    /// Run one command on the open session
    ///
    /// Exit code is carried in the output, never raised as an error; only
    /// `CommandTimeout` and `ChannelClosed` fail this operation, and they
    /// move the handle to `Failed`.
    #[instrument(skip(self, cmd), fields(host = %self.info.host))]
    pub async fn execute(
        &mut self,
        cmd: &str,
        timeout: Duration,
    ) -> Result<CommandOutput, ExecError> {
        self.transition(SessionState::Executing)?;

        self.sink.record(DiagEvent::CommandStarted {
            host: self.info.host.clone(),
            command: cmd.to_string(),
        });

        match self.session.run(cmd, timeout).await {
            Ok(output) => {
                self.transition(SessionState::Connected)?;

                debug!(
                    host = %self.info.host,
                    command = %cmd,
                    exit_code = output.exit_code,
                    duration = ?output.duration,
                    "command completed"
                );
                self.sink.record(DiagEvent::CommandFinished {
                    host: self.info.host.clone(),
                    command: cmd.to_string(),
                    exit_code: output.exit_code,
                });

                Ok(output)
            }
            Err(e) => {
                self.fail();
                Err(e)
            }
        }
    }

    /// Close the session
    ///
    /// Idempotent and safe in every state, including after a failed
    /// connect.
    pub async fn close(&mut self) {
        self.session.shutdown().await;

        if self.state != SessionState::Closed {
            let from = self.state;
            self.state = SessionState::Closed;
            debug!(host = %self.info.host, "session closed");
            self.sink.record(DiagEvent::StateChanged {
                host: self.info.host.clone(),
                from,
                to: SessionState::Closed,
            });
        }
    }

    fn transition(&mut self, to: SessionState) -> Result<(), ExecError> {
        if !self.state.can_transition_to(to) {
            return Err(ExecError::InvalidTransition {
                from: self.state,
                to,
            });
        }

        let from = self.state;
        self.state = to;
        self.sink.record(DiagEvent::StateChanged {
            host: self.info.host.clone(),
            from,
            to,
        });
        Ok(())
    }

    fn fail(&mut self) {
        let from = self.state;
        self.state = SessionState::Failed;
        self.sink.record(DiagEvent::StateChanged {
            host: self.info.host.clone(),
            from,
            to: SessionState::Failed,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Scripted session: fixed response per command, optional connect error
    struct ScriptedSession {
        connect_error: Option<ExecError>,
        run_error: Option<ExecError>,
        shutdowns: Arc<Mutex<u32>>,
    }

    impl ScriptedSession {
        fn ok() -> Self {
            Self {
                connect_error: None,
                run_error: None,
                shutdowns: Arc::new(Mutex::new(0)),
            }
        }
    }

    #[async_trait]
    impl RemoteSession for ScriptedSession {
        async fn open(
            &mut self,
            _info: &ConnectionInfo,
            _auth: &AuthMethod,
            _timeout: Duration,
        ) -> Result<(), ExecError> {
            match &self.connect_error {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn run(&mut self, cmd: &str, _timeout: Duration) -> Result<CommandOutput, ExecError> {
            match &self.run_error {
                Some(e) => Err(e.clone()),
                None => Ok(CommandOutput {
                    exit_code: 0,
                    stdout: format!("ran {cmd}"),
                    stderr: String::new(),
                    duration: Duration::from_millis(1),
                }),
            }
        }

        async fn shutdown(&mut self) {
            *self.shutdowns.lock().unwrap() += 1;
        }
    }

    /// Sink that remembers every event, for asserting observability
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<DiagEvent>>,
    }

    impl DiagnosticSink for RecordingSink {
        fn record(&self, event: DiagEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn handle(session: ScriptedSession) -> ConnectionHandle {
        ConnectionHandle::new(
            ConnectionInfo::new("box1", "alice"),
            AuthMethod::Password("pw".into()),
            Box::new(session),
        )
    }

    #[tokio::test]
    async fn test_connect_execute_close() {
        let mut conn = handle(ScriptedSession::ok());
        assert_eq!(conn.state(), SessionState::Disconnected);

        conn.connect(Duration::from_secs(1)).await.unwrap();
        assert_eq!(conn.state(), SessionState::Connected);

        let out = conn.execute("hostname", Duration::from_secs(1)).await.unwrap();
        assert_eq!(out.stdout, "ran hostname");
        assert_eq!(conn.state(), SessionState::Connected);

        conn.close().await;
        assert_eq!(conn.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_failed_connect_moves_to_failed() {
        let mut conn = handle(ScriptedSession {
            connect_error: Some(ExecError::Auth("denied".into())),
            run_error: None,
            shutdowns: Arc::new(Mutex::new(0)),
        });

        let err = conn.connect(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::Auth(_)));
        assert_eq!(conn.state(), SessionState::Failed);

        // close after failed connect is still safe
        conn.close().await;
        assert_eq!(conn.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_execute_requires_connection() {
        let mut conn = handle(ScriptedSession::ok());

        let err = conn.execute("hostname", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_execute_failure_moves_to_failed() {
        let mut conn = handle(ScriptedSession {
            connect_error: None,
            run_error: Some(ExecError::ChannelClosed("eof".into())),
            shutdowns: Arc::new(Mutex::new(0)),
        });

        conn.connect(Duration::from_secs(1)).await.unwrap();
        let err = conn.execute("uptime", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, ExecError::ChannelClosed(_)));
        assert_eq!(conn.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let shutdowns = Arc::new(Mutex::new(0));
        let mut conn = handle(ScriptedSession {
            connect_error: None,
            run_error: None,
            shutdowns: shutdowns.clone(),
        });

        conn.close().await;
        conn.close().await;
        assert_eq!(conn.state(), SessionState::Closed);
        // shutdown reached the session both times; the state change only once
        assert_eq!(*shutdowns.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sink_observes_without_changing_behavior() {
        let sink = Arc::new(RecordingSink::default());
        let mut conn = handle(ScriptedSession::ok()).with_diagnostics(sink.clone());

        conn.connect(Duration::from_secs(1)).await.unwrap();
        conn.execute("hostname", Duration::from_secs(1)).await.unwrap();
        conn.close().await;

        let events = sink.events.lock().unwrap();
        assert!(events.contains(&DiagEvent::StateChanged {
            host: "box1".into(),
            from: SessionState::Disconnected,
            to: SessionState::Connecting,
        }));
        assert!(events.contains(&DiagEvent::CommandFinished {
            host: "box1".into(),
            command: "hostname".into(),
            exit_code: 0,
        }));
        assert!(events.contains(&DiagEvent::StateChanged {
            host: "box1".into(),
            from: SessionState::Connected,
            to: SessionState::Closed,
        }));
    }
}
