//! Diagnostic sink for connection observability
//!
//! Connection handles report state transitions and command invocations to
//! a sink injected at construction time. The sink only observes; it must
//! never alter control flow or timing.

use tracing::debug;

use crate::state::SessionState;

/// One observable event in a connection's life
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagEvent {
    /// Handle moved between states
    StateChanged {
        host: String,
        from: SessionState,
        to: SessionState,
    },
    /// Command dispatched to the remote host
    CommandStarted { host: String, command: String },
    /// Command produced an exit code
    CommandFinished {
        host: String,
        command: String,
        exit_code: i32,
    },
}

/// Receives diagnostic events from connection handles
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, event: DiagEvent);
}

/// Sink that discards everything (the default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn record(&self, _event: DiagEvent) {}
}

/// Sink that forwards events to the tracing subscriber at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, event: DiagEvent) {
        match event {
            DiagEvent::StateChanged { host, from, to } => {
                debug!(host = %host, from = %from, to = %to, "state transition");
            }
            DiagEvent::CommandStarted { host, command } => {
                debug!(host = %host, command = %command, "command started");
            }
            DiagEvent::CommandFinished {
                host,
                command,
                exit_code,
            } => {
                debug!(host = %host, command = %command, exit_code, "command finished");
            }
        }
    }
}
