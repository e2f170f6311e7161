//! fleetrun-core: concurrent multi-host command execution
//!
//! Implements the `Executor` capability contract, the bounded
//! `ExecutionCoordinator`, host-list and SSH-config resolution, and the
//! structured run report.

pub mod builtin;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod hosts;
pub mod report;
pub mod ssh_config;

pub use builtin::{MetricsExecutor, SysInfoExecutor};
pub use coordinator::{
    CancelFlag, ExecutionCoordinator, RunOptions, SessionFactory, SshSessionFactory,
};
pub use error::CoreError;
pub use executor::{Executor, ExecutorFactory};
pub use hosts::{HostLine, HostOverrides, HostSpec, read_hosts_file, resolve_hosts};
pub use report::{CommandResult, HostResult, RunReport};
pub use ssh_config::{ConfigResolver, HostParams, SshConfigFile};
