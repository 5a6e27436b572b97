//! Shared types, error enum, and the detected-device descriptor.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// All errors produced by adsb-dash.
#[derive(Debug, Error)]
pub enum DashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config error: {0}")]
    Config(String),
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("tar1090 update failed: {0}")]
    Update(String),
}

pub type Result<T> = std::result::Result<T, DashError>;

/// Path served by every receiver family at the web root.
pub const DEFAULT_ENDPOINT: &str = "/data/aircraft.json";

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// How live data is reached on a detected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON over HTTP. The only transport the fetcher reads.
    Http,
    /// Raw Beast/SBS feed port. Detected, never decoded.
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => f.write_str("http"),
            Transport::Tcp => f.write_str("tcp"),
        }
    }
}

// ---------------------------------------------------------------------------
// Device type
// ---------------------------------------------------------------------------

/// Receiver software label.
///
/// `Other` carries a `version` string reported by the receiver when no
/// path-based label applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum DeviceType {
    Tar1090,
    Piaware,
    Dump1090,
    Readsb,
    Manual,
    Other(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Tar1090 => "tar1090",
            DeviceType::Piaware => "piaware",
            DeviceType::Dump1090 => "dump1090",
            DeviceType::Readsb => "readsb",
            DeviceType::Manual => "manual",
            DeviceType::Other(s) => s,
        }
    }
}

impl From<String> for DeviceType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "tar1090" => DeviceType::Tar1090,
            "piaware" => DeviceType::Piaware,
            "dump1090" => DeviceType::Dump1090,
            "readsb" => DeviceType::Readsb,
            "manual" => DeviceType::Manual,
            _ => DeviceType::Other(s),
        }
    }
}

impl From<DeviceType> for String {
    fn from(t: DeviceType) -> Self {
        match t {
            DeviceType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Device descriptor
// ---------------------------------------------------------------------------

/// A receiver found on the network (or configured by hand).
///
/// HTTP devices always carry an endpoint and TCP devices never do. Fields are
/// private so that only the constructors below can build one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDescriptor {
    host: String,
    port: u16,
    #[serde(rename = "type")]
    device_type: DeviceType,
    endpoint: Option<String>,
    transport: Transport,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw_port: Option<u16>,
}

impl DeviceDescriptor {
    /// A receiver answering JSON at `endpoint`.
    pub fn http(host: &str, port: u16, device_type: DeviceType, endpoint: &str) -> Self {
        DeviceDescriptor {
            host: host.to_string(),
            port,
            device_type,
            endpoint: Some(endpoint.to_string()),
            transport: Transport::Http,
            raw_port: None,
        }
    }

    /// A bare open raw-feed port, assumed to be a dump1090-family stream.
    pub fn tcp(host: &str, port: u16) -> Self {
        DeviceDescriptor {
            host: host.to_string(),
            port,
            device_type: DeviceType::Dump1090,
            endpoint: None,
            transport: Transport::Tcp,
            raw_port: None,
        }
    }

    /// Descriptor for a manually configured receiver. Scanning is bypassed.
    pub fn manual(host: &str, port: u16) -> Self {
        Self::http(host, port, DeviceType::Manual, DEFAULT_ENDPOINT)
    }

    /// Record the raw feed port that led to this HTTP interface.
    pub fn with_raw_port(mut self, raw_port: u16) -> Self {
        self.raw_port = Some(raw_port);
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn device_type(&self) -> &DeviceType {
        &self.device_type
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn raw_port(&self) -> Option<u16> {
        self.raw_port
    }

    /// Live-data URL. `None` for TCP devices.
    pub fn data_url(&self) -> Option<String> {
        match (self.transport, &self.endpoint) {
            (Transport::Http, Some(ep)) => Some(format!("http://{}:{}{}", self.host, self.port, ep)),
            _ => None,
        }
    }

    /// `host:port`, as shown in the location sensor and used as proxy target.
    pub fn location(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}:{} ({}",
            self.device_type, self.host, self.port, self.transport
        )?;
        if let Some(ep) = &self.endpoint {
            write!(f, " {ep}")?;
        }
        if let Some(raw) = self.raw_port {
            write!(f, ", raw port {raw}")?;
        }
        f.write_str(")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
