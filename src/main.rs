//! linkguard daemon entry point.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use linkguard::config::{load_config, ConfigReloader, ConfigWatcher, Overrides, SupervisorConfig};
use linkguard::failover::Supervisor;
use linkguard::lifecycle::daemon::daemonize;
use linkguard::lifecycle::signals::spawn_signal_handler;
use linkguard::lifecycle::shutdown::run_to_completion;
use linkguard::lifecycle::Shutdown;
use linkguard::link::Resolution;
use linkguard::observability::logging::init_logging;
use linkguard::observability::metrics::init_metrics;

const EXIT_FAILURE: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_BOOTSTRAP: u8 = 3;

/// How long exit waits for blocking filesystem calls before abandoning them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(name = "linkguard", version)]
#[command(about = "Keep a symlink pointed at a healthy replica, failing over to a local copy", long_about = None)]
struct Cli {
    /// TOML config file; command-line values win over it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Access symlink that consumers use
    #[arg(long, value_name = "PATH")]
    link: Option<PathBuf>,

    /// Preferred (usually remote) directory
    #[arg(long, value_name = "DIR")]
    primary: Option<PathBuf>,

    /// Local fallback directory
    #[arg(long, value_name = "DIR")]
    secondary: Option<PathBuf>,

    /// Limit for one sync run, in milliseconds
    #[arg(long, value_name = "MS")]
    sync_timeout_ms: Option<u64>,

    /// Sleep between cycles, in milliseconds
    #[arg(long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Shell command that checks the primary is writable
    #[arg(long, value_name = "COMMAND")]
    probe_command: Option<String>,

    /// Limit for one write probe, in milliseconds
    #[arg(long, value_name = "MS")]
    probe_timeout_ms: Option<u64>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Append child process output to this file
    #[arg(long, value_name = "FILE")]
    output_file: Option<PathBuf>,

    /// Mail transition notices to these addresses (repeatable or comma separated)
    #[arg(long = "mail-to", value_name = "ADDRESS", value_delimiter = ',')]
    mail_to: Vec<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Dry-run every sync and never touch the link
    #[arg(short = 'n', long)]
    pretend: bool,

    /// Detach into the background
    #[arg(short, long)]
    daemonize: bool,

    /// Validate the configuration, resolve the link once and exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            link: self.link.clone(),
            primary: self.primary.clone(),
            secondary: self.secondary.clone(),
            sync_timeout_ms: self.sync_timeout_ms,
            interval_ms: self.interval_ms,
            probe_command: self.probe_command.clone(),
            probe_timeout_ms: self.probe_timeout_ms,
            log_file: self.log_file.clone(),
            output_file: self.output_file.clone(),
            recipients: self.mail_to.clone(),
            verbose: self.verbose,
            pretend: self.pretend,
            daemonize: self.daemonize,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Reloads must still find the file after detaching changes directory.
    let config_path = match cli.config.as_deref().map(std::fs::canonicalize).transpose() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("linkguard: cannot open config file: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };
    let overrides = cli.overrides();
    let config = match load_config(config_path.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("linkguard: {}", e);
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    if config.runtime.daemonize && !cli.check {
        if let Err(e) = daemonize() {
            eprintln!("linkguard: failed to detach: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    }

    let _log_guard = match init_logging(&config.observability, config.runtime.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("linkguard: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    run_to_completion(
        runtime,
        run(config, config_path, overrides, cli.check),
        SHUTDOWN_GRACE,
    )
}

async fn run(
    config: SupervisorConfig,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    check: bool,
) -> ExitCode {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        link = %config.paths.link.display(),
        primary = %config.paths.primary.display(),
        secondary = %config.paths.secondary.display(),
        pretend = config.runtime.pretend,
        "linkguard starting"
    );

    if config.observability.metrics_enabled && !check {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let notifier = linkguard::notify::from_config(&config.notify, config.runtime.pretend);
    let mut supervisor = Supervisor::new(config, notifier);

    if check {
        return check_link(&supervisor).await;
    }

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();

    let (reloader, _watcher) = match config_path.as_deref() {
        Some(path) => {
            let (reloader, reloads) = ConfigReloader::new(path, overrides);
            supervisor = supervisor.with_reloads(reloads);
            (Some(reloader.clone()), start_watcher(reloader, path))
        }
        None => (None, None),
    };

    let signals = match spawn_signal_handler(shutdown, reloader) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!(error = %e, "Failed to install signal handlers");
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match supervisor.bootstrap().await {
        Ok(mode) => tracing::info!(%mode, "Bootstrap complete"),
        Err(e) => {
            tracing::error!(error = %e, "Bootstrap failed");
            signals.abort();
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    }

    supervisor.run(shutdown_rx).await;

    signals.abort();
    drop(supervisor);
    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}

fn start_watcher(reloader: ConfigReloader, path: &Path) -> Option<notify::RecommendedWatcher> {
    match ConfigWatcher::new(reloader).run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Config watcher unavailable, SIGHUP still reloads");
            None
        }
    }
}

async fn check_link(supervisor: &Supervisor) -> ExitCode {
    let link = supervisor.link().link();
    if let Err(e) = supervisor.link().inspect_entry().await {
        println!("{}: unusable: {}", link.display(), e);
        return ExitCode::from(EXIT_BOOTSTRAP);
    }
    match supervisor.resolve_link().await {
        Resolution::Points(role) => {
            println!("{}: points at {} ({})", link.display(), role, supervisor.link().target(role).display());
            ExitCode::SUCCESS
        }
        Resolution::Foreign(target) => {
            println!("{}: points at unknown target {}", link.display(), target.display());
            ExitCode::from(EXIT_BOOTSTRAP)
        }
        Resolution::Unresolved(reason) => {
            println!("{}: unresolvable: {}", link.display(), reason);
            ExitCode::from(EXIT_BOOTSTRAP)
        }
    }
}
