//! Home Assistant entity states published by the dashboard.
//!
//! Builds the `{"state", "attributes"}` bodies for `/api/states/<entity_id>`.
//! The HTTP side lives in the service crate.

use serde_json::{json, Value};

use crate::summary::AircraftSummary;
use crate::types::DeviceDescriptor;

pub const RECEIVER_STATUS: &str = "binary_sensor.adsb_receiver";
pub const AIRCRAFT_COUNT: &str = "sensor.adsb_aircraft_count";
pub const MESSAGE_RATE: &str = "sensor.adsb_message_rate";
pub const RECEIVER_TYPE: &str = "sensor.adsb_receiver_type";
pub const RECEIVER_LOCATION: &str = "sensor.adsb_receiver_location";

/// One entity update.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityState {
    pub entity_id: &'static str,
    pub state: String,
    pub attributes: Value,
}

impl EntityState {
    fn new(entity_id: &'static str, state: impl Into<String>, attributes: Value) -> Self {
        EntityState {
            entity_id,
            state: state.into(),
            attributes,
        }
    }

    /// Request body for the states API.
    pub fn body(&self) -> Value {
        json!({
            "state": self.state,
            "attributes": self.attributes,
        })
    }
}

/// The five entities in their startup state.
pub fn initial_entities() -> Vec<EntityState> {
    vec![
        EntityState::new(
            RECEIVER_STATUS,
            "off",
            json!({
                "friendly_name": "ADS-B Receiver Status",
                "device_class": "connectivity",
                "icon": "mdi:airplane",
            }),
        ),
        aircraft_count(0, None),
        message_rate(0.0),
        receiver_type("unknown"),
        receiver_location("unknown".into()),
    ]
}

/// Connectivity sensor, plus type and location when a device is known.
pub fn receiver_status(online: bool, device: Option<&DeviceDescriptor>) -> Vec<EntityState> {
    let state = if online { "on" } else { "off" };
    let mut attributes = json!({
        "friendly_name": "ADS-B Receiver Status",
        "device_class": "connectivity",
        "icon": if online { "mdi:airplane" } else { "mdi:airplane-off" },
    });

    let Some(device) = device else {
        return vec![EntityState::new(RECEIVER_STATUS, state, attributes)];
    };

    attributes["device_type"] = json!(device.device_type().as_str());
    attributes["host"] = json!(device.host());
    attributes["port"] = json!(device.port());

    vec![
        EntityState::new(RECEIVER_STATUS, state, attributes),
        receiver_location(device.location()),
        receiver_type(device.device_type().as_str()),
    ]
}

/// Count and rate sensors. `None` publishes zeros.
pub fn aircraft_entities(summary: Option<&AircraftSummary>) -> Vec<EntityState> {
    match summary {
        Some(s) => vec![aircraft_count(s.with_position, Some(s.total)), message_rate(s.message_rate)],
        None => vec![aircraft_count(0, None), message_rate(0.0)],
    }
}

fn aircraft_count(count: usize, total: Option<usize>) -> EntityState {
    let mut attributes = json!({
        "friendly_name": "Visible Aircraft",
        "unit_of_measurement": "aircraft",
        "icon": "mdi:airplane-clock",
    });
    if let Some(total) = total {
        attributes["total_aircraft"] = json!(total);
    }
    EntityState::new(AIRCRAFT_COUNT, count.to_string(), attributes)
}

fn message_rate(rate: f64) -> EntityState {
    EntityState::new(
        MESSAGE_RATE,
        rate.to_string(),
        json!({
            "friendly_name": "Message Rate",
            "unit_of_measurement": "msg/s",
            "icon": "mdi:radio-tower",
        }),
    )
}

fn receiver_type(label: &str) -> EntityState {
    EntityState::new(
        RECEIVER_TYPE,
        label,
        json!({"friendly_name": "Receiver Type", "icon": "mdi:chip"}),
    )
}

fn receiver_location(location: String) -> EntityState {
    EntityState::new(
        RECEIVER_LOCATION,
        location,
        json!({"friendly_name": "Receiver Location", "icon": "mdi:map-marker-radius"}),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
