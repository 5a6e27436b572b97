//! Aircraft statistics derived from an aircraft.json payload.

use serde::Serialize;
use serde_json::Value;

/// Counts published to the dashboard sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct AircraftSummary {
    /// Aircraft carrying both `lat` and `lon`.
    pub with_position: usize,
    /// Every entry in `aircraft`.
    pub total: usize,
    /// The receiver's `messages` counter, 0 when absent or non-numeric.
    pub message_rate: f64,
}

impl AircraftSummary {
    pub fn from_payload(payload: &Value) -> Self {
        let aircraft = payload
            .get("aircraft")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let with_position = aircraft
            .iter()
            .filter(|ac| ac.get("lat").is_some() && ac.get("lon").is_some())
            .count();

        AircraftSummary {
            with_position,
            total: aircraft.len(),
            message_rate: payload.get("messages").and_then(Value::as_f64).unwrap_or(0.0),
        }
    }
}
