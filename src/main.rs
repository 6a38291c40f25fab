/*!
 * Tether CLI - Command Line Interface
 *
 * Author: Shane Wall <shaneawall@gmail.com>
 */

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tether::{
    config::{AcquireConfig, LogLevel, VersionCheckMode},
    error::{Result, TetherError, EXIT_SUCCESS},
    logging,
    output::{AcquireReport, OutputWriter},
    system, DeviceOrchestrator,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "tether")]
#[command(version, about = "Acquire a development device for on-device test runs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stderr)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Select, connect to and optionally reconcile one device
    Acquire(AcquireArgs),

    /// List the devices visible to the host
    List,
}

#[derive(Args)]
struct AcquireArgs {
    /// Node name of the device to use
    #[arg(short = 'n', long, value_name = "NAME")]
    node_name: Option<String>,

    /// Connect to this host directly, skipping discovery
    #[arg(long)]
    host: Option<String>,

    /// SSH port for --host (default: 22)
    #[arg(short = 'p', long, requires = "host")]
    port: Option<u16>,

    /// SSH client config file
    #[arg(long, value_name = "FILE")]
    ssh_config: Option<PathBuf>,

    /// Version reconciliation mode (ignore, check, update)
    #[arg(long, value_name = "MODE", value_parser = parse_os_check)]
    os_check: Option<VersionCheckMode>,

    /// Local system image to reconcile against
    #[arg(long, value_name = "DIR")]
    system_image_dir: Option<PathBuf>,

    /// Build output directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Target CPU architecture
    #[arg(long)]
    target_cpu: Option<String>,

    /// Directory for run logs
    #[arg(long, value_name = "DIR")]
    logs_dir: Option<PathBuf>,
}

fn parse_os_check(s: &str) -> std::result::Result<VersionCheckMode, String> {
    s.parse().map_err(|e: TetherError| e.to_string())
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    let code = match run(cli, &output) {
        Ok(code) => code,
        Err(e) => {
            output.error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, output: &OutputWriter) -> Result<i32> {
    let acquire_args = match cli.command {
        Commands::Acquire(ref args) => Some(args),
        Commands::List => None,
    };

    let config = build_config(&cli, acquire_args)?;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Acquire(_) => Ok(runtime.block_on(handle_acquire(config, output))),
        Commands::List => runtime.block_on(handle_list(&config, output)),
    }
}

/// Config file first, then command-line flags on top
fn build_config(cli: &Cli, args: Option<&AcquireArgs>) -> Result<AcquireConfig> {
    let mut config = match cli.config {
        Some(ref path) => AcquireConfig::from_file(path)?,
        None => AcquireConfig::default(),
    };

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Some(args) = args {
        if args.node_name.is_some() {
            config.node_name = args.node_name.clone();
        }
        if args.host.is_some() {
            config.host = args.host.clone();
        }
        if args.port.is_some() {
            config.port = args.port;
        }
        if args.ssh_config.is_some() {
            config.ssh_config = args.ssh_config.clone();
        }
        if let Some(mode) = args.os_check {
            config.os_check = mode;
        }
        if args.system_image_dir.is_some() {
            config.system_image_dir = args.system_image_dir.clone();
        }
        if let Some(ref dir) = args.out_dir {
            config.out_dir = dir.clone();
        }
        if let Some(ref cpu) = args.target_cpu {
            config.target_cpu = cpu.clone();
        }
        if args.logs_dir.is_some() {
            config.logs_dir = args.logs_dir.clone();
        }
    }

    config.validate()?;
    Ok(config)
}

async fn handle_acquire(config: AcquireConfig, output: &OutputWriter) -> i32 {
    let collaborators = system::host_collaborators(&config);
    let mut device = DeviceOrchestrator::new(config, collaborators);

    let outcome = device.start().await;
    let report = AcquireReport::from_run(&device, outcome.as_ref().map(|_| ()));
    output.acquire_report(&report);
    device.release();

    match outcome {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => e.exit_code(),
    }
}

async fn handle_list(config: &AcquireConfig, output: &OutputWriter) -> Result<i32> {
    let collaborators = system::host_collaborators(config);
    let devices = collaborators
        .discovery
        .list_targets()
        .await
        .map_err(TetherError::from)?;
    info!(count = devices.len(), "Listed devices");
    output.device_list(&devices);
    Ok(EXIT_SUCCESS)
}
