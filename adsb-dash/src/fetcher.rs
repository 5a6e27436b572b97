//! Live aircraft.json pulls from a detected receiver.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, error};

use adsb_dash_core::DeviceDescriptor;

/// Reads aircraft.json from HTTP receivers.
///
/// Raw TCP feeds are never read: Beast/SBS decoding is not implemented.
#[derive(Clone)]
pub struct AircraftFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl AircraftFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        AircraftFetcher { client, timeout }
    }

    /// One GET of the device's data URL. `None` on any failure.
    pub async fn fetch(&self, device: &DeviceDescriptor) -> Option<Value> {
        let Some(url) = device.data_url() else {
            debug!(device = %device, "no HTTP endpoint to fetch from");
            return None;
        };

        let resp = match self.client.get(&url).timeout(self.timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                error!(%url, error = %e, "failed to get aircraft data");
                return None;
            }
        };

        if resp.status() != StatusCode::OK {
            error!(%url, status = %resp.status(), "failed to get aircraft data");
            return None;
        }

        match resp.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                error!(%url, error = %e, "aircraft data is not valid JSON");
                None
            }
        }
    }
}
