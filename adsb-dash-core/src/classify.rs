//! Receiver identification from a matched HTTP path and its JSON payload.
//!
//! Pure functions. The probe calls `is_aircraft_payload` to accept a
//! response and `classify` to label it.

use serde_json::Value;

use crate::types::DeviceType;

/// Raw-feed ports (Beast/SBS/AVR), tried before the HTTP ports.
pub const RAW_PORTS: &[u16] = &[30002, 30003, 30005, 30104];

/// Ports probed for a JSON web interface, in order.
pub const HTTP_PORTS: &[u16] = &[8080, 8081, 80];

/// Candidate aircraft.json locations, in order.
pub const AIRCRAFT_PATHS: &[&str] = &[
    "/data/aircraft.json",
    "/tar1090/data/aircraft.json",
    "/skyaware/data/aircraft.json",
    "/dump1090/data/aircraft.json",
];

/// True when a decoded body looks like an aircraft.json document.
///
/// Requires a JSON object with an `aircraft` or a `now` key.
pub fn is_aircraft_payload(payload: &Value) -> bool {
    payload
        .as_object()
        .is_some_and(|obj| obj.contains_key("aircraft") || obj.contains_key("now"))
}

/// Label a receiver. Path rules outrank the payload's `version` field.
pub fn classify(path: &str, payload: &Value) -> DeviceType {
    if path.contains("tar1090") {
        return DeviceType::Tar1090;
    }
    if path.contains("skyaware") {
        return DeviceType::Piaware;
    }
    if path.contains("dump1090") {
        return DeviceType::Dump1090;
    }
    match payload.get("version") {
        Some(Value::String(v)) if !v.is_empty() => DeviceType::from(v.clone()),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => DeviceType::Other(n.to_string()),
        _ => DeviceType::Readsb,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
