//! Structured output writer supporting JSON and human-readable modes.

use comfy_table::{presets, Attribute, Cell, ContentArrangement, Table};
use serde::Serialize;
use tether_interface::DeviceDescriptor;

use crate::error::TetherError;
use crate::lifecycle::AcquireState;
use crate::orchestrator::DeviceOrchestrator;

/// Output mode for CLI results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Machine-readable failure description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

impl From<&TetherError> for ErrorReport {
    fn from(err: &TetherError) -> Self {
        Self {
            kind: err.kind(),
            message: sanitize_error(&err.to_string()),
        }
    }
}

/// Outcome of one `acquire` run
#[derive(Debug, Clone, Serialize)]
pub struct AcquireReport {
    pub success: bool,
    pub state: AcquireState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub provisioned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl AcquireReport {
    /// Snapshot an orchestrator after `start` returned
    pub fn from_run(device: &DeviceOrchestrator, outcome: Result<(), &TetherError>) -> Self {
        Self {
            success: outcome.is_ok(),
            state: device.state(),
            node_name: device.node_name().map(str::to_string),
            host: device.host().map(str::to_string),
            port: device.port(),
            provisioned: device.provisioned(),
            error: outcome.err().map(ErrorReport::from),
        }
    }

    /// Report for a run that failed before an orchestrator existed
    pub fn failed(err: &TetherError) -> Self {
        Self {
            success: false,
            state: AcquireState::Failed,
            node_name: None,
            host: None,
            port: None,
            provisioned: false,
            error: Some(ErrorReport::from(err)),
        }
    }

    /// One line per fact, for terminals
    pub fn to_human(&self) -> String {
        if let Some(ref err) = self.error {
            return format!("Error: {}", err.message);
        }

        let mut lines = Vec::new();
        if let Some(ref name) = self.node_name {
            lines.push(format!("node_name: {}", name));
        }
        match (&self.host, self.port) {
            (Some(host), Some(port)) => {
                lines.push(format!("host: {}", host));
                lines.push(format!("port: {}", port));
            }
            _ => lines.push("host: unknown (device was flashed without answering)".to_string()),
        }
        if self.provisioned {
            lines.push("provisioned: yes".to_string());
        }
        lines.join("\n")
    }
}

/// Structured output writer that supports both human-readable and JSON output
#[derive(Debug, Clone)]
pub struct OutputWriter {
    pub mode: OutputMode,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            mode: if json { OutputMode::Json } else { OutputMode::Human },
        }
    }

    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Print an acquire report; failures go to stderr in human mode
    pub fn acquire_report(&self, report: &AcquireReport) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(report) {
                    println!("{}", json);
                }
            }
            OutputMode::Human if report.success => println!("{}", report.to_human()),
            OutputMode::Human => eprintln!("{}", report.to_human()),
        }
    }

    /// Print a discovery listing
    pub fn device_list(&self, devices: &[DeviceDescriptor]) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(devices) {
                    println!("{}", json);
                }
            }
            OutputMode::Human => print!("{}", render_device_table(devices)),
        }
    }

    /// Print an error message
    pub fn error(&self, err: &TetherError) {
        match self.mode {
            OutputMode::Json => {
                if let Ok(json) = serde_json::to_string(&ErrorReport::from(err)) {
                    eprintln!("{}", json);
                }
            }
            OutputMode::Human => eprintln!("Error: {}", sanitize_error(&err.to_string())),
        }
    }
}

/// Table of discovered devices, one row each
pub fn render_device_table(devices: &[DeviceDescriptor]) -> String {
    if devices.is_empty() {
        return "No devices found.\n".to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            ["NODE NAME", "STATE", "RCS", "ADDRESSES"]
                .into_iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );

    for device in devices {
        table.add_row(vec![
            Cell::new(&device.node_name),
            Cell::new(&device.target_state),
            Cell::new(&device.rcs_state),
            Cell::new(device.addresses.join(", ")),
        ]);
    }
    format!("{}\n", table)
}

/// Sanitize error messages by collapsing whitespace
pub fn sanitize_error(msg: &str) -> String {
    msg.split_whitespace().collect::<Vec<&str>>().join(" ")
}
