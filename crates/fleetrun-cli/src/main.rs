//! fleetrun CLI
//!
//! Executes a command set on many hosts over SSH concurrently and
//! reports structured per-host results.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use color_eyre::Result;
use eyre::WrapErr;
use tracing::warn;

use fleetrun_core::{
    Executor, ExecutionCoordinator, HostOverrides, MetricsExecutor, RunOptions, SshConfigFile,
    SshSessionFactory, SysInfoExecutor, read_hosts_file, resolve_hosts,
};
use fleetrun_exec::{AuthOptions, AuthResolver, TracingSink};

mod config;
mod render;

#[derive(Parser)]
#[command(name = "fleetrun")]
#[command(about = "Execute commands on multiple hosts via SSH concurrently", long_about = None)]
struct Cli {
    /// File containing list of hostnames (one per line)
    #[arg(short = 'f', long = "hosts-file")]
    hosts_file: PathBuf,

    /// SSH username (if not specified in hostname as user@host)
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// SSH identity file (private key) path. Can also be set via the
    /// SSH_IDENTITY_FILE env var
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Maximum number of concurrent SSH connections
    #[arg(short = 'w', long = "workers", visible_alias = "concurrency")]
    workers: Option<usize>,

    /// Command set to run on every host
    #[arg(long, value_enum, default_value_t = ExecutorKind::Sysinfo)]
    executor: ExecutorKind,

    /// Connection timeout in seconds
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Per-command timeout in seconds
    #[arg(long)]
    command_timeout: Option<u64>,

    /// Count any non-zero exit code as a host failure
    #[arg(long)]
    require_zero_exit: bool,

    /// SSH client config to consult (default ~/.ssh/config)
    #[arg(long)]
    ssh_config: Option<PathBuf>,

    /// Emit the full report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

/// Built-in command sets
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExecutorKind {
    /// hostname, uname, uptime
    Sysinfo,
    /// CPU, memory, disk, and uptime metrics
    Metrics,
}

impl ExecutorKind {
    fn create(self) -> Box<dyn Executor> {
        match self {
            ExecutorKind::Sysinfo => Box::new(SysInfoExecutor),
            ExecutorKind::Metrics => Box::new(MetricsExecutor),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(if cli.debug { "debug" } else { "warn" })
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let defaults = config::Defaults::load_default()?;

    // Flags win over the defaults file; the env var sits between them
    // for the identity file, matching the documented surface.
    let identity_file = cli
        .identity_file
        .clone()
        .or_else(|| std::env::var_os("SSH_IDENTITY_FILE").map(PathBuf::from))
        .or_else(|| defaults.identity_file.clone());
    let username = cli.username.clone().or_else(|| defaults.username.clone());
    let workers = cli.workers.or(defaults.workers).unwrap_or(5);
    let connect_timeout = cli
        .connect_timeout
        .or(defaults.connect_timeout_secs)
        .unwrap_or(10);
    let command_timeout = cli
        .command_timeout
        .or(defaults.command_timeout_secs)
        .unwrap_or(30);

    // Read and resolve the host list
    let lines = read_hosts_file(&cli.hosts_file)
        .wrap_err_with(|| format!("cannot load hosts from {}", cli.hosts_file.display()))?;

    let ssh_config = match &cli.ssh_config {
        Some(path) => SshConfigFile::load(path),
        None => dirs::home_dir()
            .map(|home| SshConfigFile::load(&home.join(".ssh/config")))
            .unwrap_or_default(),
    };

    let overrides = HostOverrides { user: username };
    let hosts = resolve_hosts(&lines, &overrides, &ssh_config);

    if !cli.json {
        println!(
            "Executing commands on {} hosts from {}...",
            hosts.len(),
            cli.hosts_file.display()
        );
    }

    let auth = AuthResolver::new(AuthOptions {
        identity_file,
        password: defaults.password.clone(),
    });

    let kind = cli.executor;
    let mut coordinator = ExecutionCoordinator::new(
        Arc::new(move || kind.create()),
        Arc::new(SshSessionFactory),
        auth,
        RunOptions {
            workers,
            connect_timeout: Duration::from_secs(connect_timeout),
            command_timeout: Duration::from_secs(command_timeout),
            require_zero_exit: cli.require_zero_exit,
        },
    )?;

    if cli.debug {
        coordinator = coordinator.with_diagnostics(Arc::new(TracingSink));
    }

    // Ctrl-C stops admitting queued hosts; running hosts drain their
    // in-flight command and stop at the next boundary.
    let cancel = coordinator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            cancel.cancel();
        }
    });

    let report = coordinator.run(hosts).await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        render::print_report(&report);
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
