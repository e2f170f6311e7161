//! `ExecutionCoordinator`: bounded concurrent execution across hosts
//!
//! Runs one task per host under a fixed concurrency limit, isolates
//! per-host failures, and aggregates results in submission order. Hosts
//! are parallelized; commands within one host never are.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use fleetrun_exec::{
    AuthResolver, ConnectionHandle, DiagnosticSink, NullSink, RemoteSession, SshSession,
};

use crate::error::CoreError;
use crate::executor::{Executor, ExecutorFactory};
use crate::hosts::HostSpec;
use crate::report::{CommandResult, HostResult, RunReport};

/// Tunables for one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Concurrency limit: at most this many hosts in flight at once
    pub workers: usize,
    /// Timeout for establishing one connection
    pub connect_timeout: Duration,
    /// Timeout for one command
    pub command_timeout: Duration,
    /// When true, host success additionally requires exit code 0 from
    /// every command; by default only transport-level failures count
    pub require_zero_exit: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(30),
            require_zero_exit: false,
        }
    }
}

/// Cooperative cancellation signal shared with the caller
///
/// Once set, queued hosts are not admitted and running hosts stop at
/// the next command boundary; the in-flight command drains.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Creates one session per host task
///
/// Implemented for plain closures, so tests can inject scripted
/// sessions with `|| Box::new(FakeSession::new())`.
pub trait SessionFactory: Send + Sync {
    fn create(&self) -> Box<dyn RemoteSession>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> Box<dyn RemoteSession> + Send + Sync,
{
    fn create(&self) -> Box<dyn RemoteSession> {
        self()
    }
}

/// Default factory producing real SSH sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct SshSessionFactory;

impl SessionFactory for SshSessionFactory {
    fn create(&self) -> Box<dyn RemoteSession> {
        Box::new(SshSession::new())
    }
}

/// Schedules host tasks against a bounded worker pool
pub struct ExecutionCoordinator {
    executors: Arc<dyn ExecutorFactory>,
    sessions: Arc<dyn SessionFactory>,
    auth: AuthResolver,
    options: RunOptions,
    sink: Arc<dyn DiagnosticSink>,
    cancel: CancelFlag,
}

impl ExecutionCoordinator {
    /// Create a coordinator
    ///
    /// # Errors
    /// `CoreError::ZeroWorkers` if the concurrency limit is zero.
    pub fn new(
        executors: Arc<dyn ExecutorFactory>,
        sessions: Arc<dyn SessionFactory>,
        auth: AuthResolver,
        options: RunOptions,
    ) -> Result<Self, CoreError> {
        if options.workers == 0 {
            return Err(CoreError::ZeroWorkers);
        }

        Ok(Self {
            executors,
            sessions,
            auth,
            options,
            sink: Arc::new(NullSink),
            cancel: CancelFlag::default(),
        })
    }

    /// Attach a diagnostic sink passed through to every connection
    #[must_use]
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Handle for requesting cooperative cancellation
    #[must_use]
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Run the full host list to completion
    ///
    /// Returns only once every submitted host has produced a
    /// `HostResult`; per-host failures are data in the report, never
    /// errors from this call.
    pub async fn run(&self, hosts: Vec<HostSpec>) -> RunReport {
        let started_at = Utc::now();
        let total = hosts.len();

        info!(
            total_hosts = total,
            workers = self.options.workers,
            "starting run"
        );

        let semaphore = Arc::new(Semaphore::new(self.options.workers));
        let mut handles = Vec::with_capacity(total);

        for spec in hosts {
            let semaphore = semaphore.clone();
            let executor = self.executors.create();
            let session = self.sessions.create();
            let auth = self.auth.clone();
            let options = self.options.clone();
            let sink = self.sink.clone();
            let cancel = self.cancel.clone();
            let alias = spec.alias.clone();

            let handle = tokio::spawn(async move {
                // The permit gates admission; acquisition order is the
                // FIFO submission order.
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return HostResult::failed(spec.alias, "worker pool closed");
                    }
                };

                if cancel.is_cancelled() {
                    return HostResult::failed(
                        spec.alias,
                        "run cancelled before host was admitted",
                    );
                }

                run_host(spec, executor.as_ref(), session, &auth, &options, &cancel, sink).await
            });

            handles.push((alias, handle));
        }

        // Await in submission order; completion order does not matter
        // because each slot is owned by exactly one host.
        let mut results = Vec::with_capacity(total);
        for (alias, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(host = %alias, error = %e, "host task panicked");
                    results.push(HostResult::failed(alias, format!("host task panicked: {e}")));
                }
            }
        }

        let report = RunReport::new(results, started_at);

        info!(
            total = report.total_hosts,
            successful = report.successful_hosts,
            "run finished"
        );

        report
    }
}

/// Run one host's full command sequence on its own connection
async fn run_host(
    spec: HostSpec,
    executor: &dyn Executor,
    session: Box<dyn RemoteSession>,
    auth: &AuthResolver,
    options: &RunOptions,
    cancel: &CancelFlag,
    sink: Arc<dyn DiagnosticSink>,
) -> HostResult {
    let alias = spec.alias.clone();

    let method = match auth.resolve(spec.identity_file.as_deref()) {
        Ok(method) => method,
        Err(e) => {
            warn!(host = %alias, error = %e, "auth resolution failed");
            return HostResult::failed(alias, e.to_string());
        }
    };

    let mut conn = ConnectionHandle::new(spec.connection_info(), method, session)
        .with_diagnostics(sink);

    if let Err(e) = conn.connect(options.connect_timeout).await {
        warn!(host = %alias, error = %e, "connection failed");
        conn.close().await;
        return HostResult::failed(alias, e.to_string());
    }

    let mut commands = Vec::new();
    let mut success = true;
    let mut error = None;

    for command in executor.commands() {
        if cancel.is_cancelled() {
            success = false;
            error = Some("run cancelled".to_string());
            break;
        }

        match conn.execute(&command, options.command_timeout).await {
            Ok(output) => {
                let parsed =
                    executor.parse(&command, &output.stdout, &output.stderr, output.exit_code);
                commands.push(CommandResult {
                    command,
                    exit_code: output.exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                    parsed,
                    success: output.exit_code == 0,
                    duration: output.duration,
                });
            }
            Err(e) => {
                // Abandon remaining commands, keep the partials
                warn!(host = %alias, command = %command, error = %e, "command failed");
                success = false;
                error = Some(e.to_string());
                break;
            }
        }
    }

    conn.close().await;

    if options.require_zero_exit && commands.iter().any(|c| !c.success) {
        success = false;
        error.get_or_insert_with(|| "one or more commands exited non-zero".to_string());
    }

    HostResult {
        host: alias,
        success,
        error,
        commands,
    }
}
