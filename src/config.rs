/*!
 * Configuration types for Tether
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{Result, TetherError};

/// How the installed software is reconciled against a local image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VersionCheckMode {
    /// Skip reconciliation entirely
    #[default]
    Ignore,

    /// Compare only; fail on mismatch, never provision
    Check,

    /// Compare and provision automatically on mismatch
    Update,
}

impl VersionCheckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionCheckMode::Ignore => "ignore",
            VersionCheckMode::Check => "check",
            VersionCheckMode::Update => "update",
        }
    }
}

impl fmt::Display for VersionCheckMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VersionCheckMode {
    type Err = TetherError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(VersionCheckMode::Ignore),
            "check" => Ok(VersionCheckMode::Check),
            "update" => Ok(VersionCheckMode::Update),
            other => Err(TetherError::Config(format!(
                "Unknown os check mode '{}' (expected ignore, check or update)",
                other
            ))),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

/// Settings for the device-control CLI used for discovery, lookup and flashing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Program name or path
    #[serde(default = "default_tool_program")]
    pub program: PathBuf,

    /// Bound on `target list`
    #[serde(default = "default_list_timeout")]
    pub list_timeout_secs: u64,

    /// Bound on resolving a node name to an address
    #[serde(default = "default_address_timeout")]
    pub address_timeout_secs: u64,

    /// Bound on a flash run
    #[serde(default = "default_flash_timeout")]
    pub flash_timeout_secs: u64,

    /// Flash manifest, relative to the system image directory
    #[serde(default = "default_flash_manifest")]
    pub flash_manifest: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: default_tool_program(),
            list_timeout_secs: default_list_timeout(),
            address_timeout_secs: default_address_timeout(),
            flash_timeout_secs: default_flash_timeout(),
            flash_manifest: default_flash_manifest(),
        }
    }
}

/// Settings for the SSH control session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshOptions {
    /// Remote user, if not given by the SSH config
    #[serde(default)]
    pub user: Option<String>,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            user: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

/// Configuration for one device acquisition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquireConfig {
    /// Node name of the device to use; discovery picks one when unset
    #[serde(default)]
    pub node_name: Option<String>,

    /// Build output directory
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Target CPU tag (x64, arm64)
    #[serde(default = "default_target_cpu")]
    pub target_cpu: String,

    /// Explicit host; bypasses discovery and address lookup
    #[serde(default)]
    pub host: Option<String>,

    /// Explicit SSH port, used with `host`
    #[serde(default)]
    pub port: Option<u16>,

    /// SSH config file passed to every ssh invocation
    #[serde(default)]
    pub ssh_config: Option<PathBuf>,

    /// Version reconciliation mode
    #[serde(default)]
    pub os_check: VersionCheckMode,

    /// Local system image to reconcile against and provision from
    #[serde(default)]
    pub system_image_dir: Option<PathBuf>,

    /// Directory for run logs (passed through to collaborators)
    #[serde(default)]
    pub logs_dir: Option<PathBuf>,

    /// Device-control CLI settings
    #[serde(default)]
    pub tool: ToolConfig,

    /// SSH session settings
    #[serde(default)]
    pub ssh: SshOptions,

    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout, or `logs_dir` when set)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            node_name: None,
            out_dir: default_out_dir(),
            target_cpu: default_target_cpu(),
            host: None,
            port: None,
            ssh_config: None,
            os_check: VersionCheckMode::Ignore,
            system_image_dir: None,
            logs_dir: None,
            tool: ToolConfig::default(),
            ssh: SshOptions::default(),
            log_level: LogLevel::Info,
            log_file: None,
            verbose: false,
        }
    }
}

// Default value functions for serde
fn default_out_dir() -> PathBuf {
    PathBuf::from("out/fuchsia")
}

fn default_target_cpu() -> String {
    "x64".to_string()
}

fn default_tool_program() -> PathBuf {
    PathBuf::from("ffx")
}

fn default_list_timeout() -> u64 {
    30
}

fn default_address_timeout() -> u64 {
    30
}

fn default_flash_timeout() -> u64 {
    20 * 60
}

fn default_flash_manifest() -> PathBuf {
    PathBuf::from("flash-manifest.manifest")
}

fn default_connect_timeout() -> u64 {
    30
}

/// Default SSH port when a host is given without one
pub const DEFAULT_SSH_PORT: u16 = 22;

impl AcquireConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| {
            TetherError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| TetherError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Whether installed software is compared against a local image
    pub fn reconciliation_enabled(&self) -> bool {
        self.os_check != VersionCheckMode::Ignore && self.system_image_dir.is_some()
    }

    /// Effective SSH port for an explicit host
    pub fn effective_port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_SSH_PORT)
    }

    /// Reject combinations that cannot produce a meaningful run
    pub fn validate(&self) -> Result<()> {
        if self.port.is_some() && self.host.is_none() {
            return Err(TetherError::Config("--port requires --host".to_string()));
        }

        if let Some(ref name) = self.node_name {
            if name.trim().is_empty() {
                return Err(TetherError::Config("node name is empty".to_string()));
            }
        }

        if self.os_check != VersionCheckMode::Ignore {
            if let Some(ref dir) = self.system_image_dir {
                if !dir.is_dir() {
                    return Err(TetherError::Config(format!(
                        "system image directory {} does not exist",
                        dir.display()
                    )));
                }
            }
        }

        Ok(())
    }
}
