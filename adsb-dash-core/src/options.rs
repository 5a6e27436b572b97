//! Add-on options management.
//!
//! Reads the supervisor-mounted `/data/options.json` with log level, scan
//! cadence, probe tuning, and the manual receiver override.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::types::{DashError, DeviceDescriptor, Result};

/// Default location of the options file inside the add-on container.
pub const DEFAULT_OPTIONS_PATH: &str = "/data/options.json";

/// Full options structure. Every key is optional in the file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    pub log_level: String,
    pub update_tar1090: bool,
    pub auto_detect: bool,
    /// Seconds between network scans.
    pub scan_interval: u64,
    /// Seconds between aircraft data polls.
    pub update_interval: u64,
    /// Per-operation probe and fetch timeout, seconds.
    pub probe_timeout: u64,
    /// Maximum hosts probed at once.
    pub scan_concurrency: usize,
    pub manual_host: String,
    pub manual_port: u16,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            log_level: "info".into(),
            update_tar1090: true,
            auto_detect: true,
            scan_interval: 30,
            update_interval: 5,
            probe_timeout: 2,
            scan_concurrency: 254,
            manual_host: String::new(),
            manual_port: 0,
        }
    }
}

impl Options {
    /// The manual override, when both host and port are configured.
    pub fn manual_device(&self) -> Option<DeviceDescriptor> {
        let host = self.manual_host.trim();
        if host.is_empty() || self.manual_port == 0 {
            return None;
        }
        Some(DeviceDescriptor::manual(host, self.manual_port))
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval.max(1))
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.max(1))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout.max(1))
    }

    /// Concurrency cap, never zero.
    pub fn scan_concurrency(&self) -> usize {
        self.scan_concurrency.max(1)
    }

    /// `log_level` as a tracing filter directive.
    ///
    /// Accepts the add-on's vocabulary (`warning`, `critical`) as well as
    /// tracing's own level names. Unknown values fall back to `info`.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" | "fatal" => "error",
            _ => "info",
        }
    }
}

/// Parse options JSON text.
pub fn parse_options(text: &str) -> Result<Options> {
    let options: Options = serde_json::from_str(text)?;
    Ok(options)
}

/// Load options from `path`.
///
/// Returns default options if the file doesn't exist; a file that exists
/// but can't be read or parsed is an error so the caller can report it.
pub fn load_options(path: &Path) -> Result<Options> {
    if !path.exists() {
        return Ok(Options::default());
    }
    let text = std::fs::read_to_string(path)?;
    parse_options(&text).map_err(|e| DashError::Config(format!("{}: {e}", path.display())))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
