//! The executor capability contract
//!
//! An `Executor` declares which commands to run on every host and how to
//! turn each command's raw output into a structured record. The
//! sequential per-host orchestration lives in the coordinator and is
//! never reimplemented per executor.

use serde_json::Value;

/// Declares commands and parses their output
pub trait Executor: Send + Sync {
    /// Ordered command list; pure and deterministic, evaluated once per
    /// host task. Order is preserved in the results.
    fn commands(&self) -> Vec<String>;

    /// Turn one command's raw output into a structured record
    ///
    /// Must be total: every input produces a record, including empty
    /// output and non-zero exit codes. Parsers that cannot interpret
    /// the output fall back to a record carrying the raw text and an
    /// explicit failure marker rather than aborting the host task.
    fn parse(&self, command: &str, stdout: &str, stderr: &str, exit_code: i32) -> Value;
}

/// Creates one executor per host task
///
/// Implemented for plain closures so callers can write
/// `|| Box::new(MyExecutor)` without a dedicated factory type.
pub trait ExecutorFactory: Send + Sync {
    fn create(&self) -> Box<dyn Executor>;
}

impl<F> ExecutorFactory for F
where
    F: Fn() -> Box<dyn Executor> + Send + Sync,
{
    fn create(&self) -> Box<dyn Executor> {
        self()
    }
}
