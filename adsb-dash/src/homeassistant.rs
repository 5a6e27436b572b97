//! Home Assistant state publishing over the supervisor REST API.
//!
//! Fire-and-log: every POST failure is logged and reported as `false`,
//! never raised.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info};

use adsb_dash_core::entities::{self, EntityState};
use adsb_dash_core::{AircraftSummary, DeviceDescriptor};

/// Core API as seen from inside a supervisor add-on.
pub const DEFAULT_HA_URL: &str = "http://supervisor/core";

/// Sink for dashboard state. The service loops only talk to this trait.
#[async_trait]
pub trait StatePublisher: Send + Sync {
    async fn create_entities(&self);
    async fn update_receiver_status(&self, online: bool, device: Option<&DeviceDescriptor>);
    async fn update_aircraft_data(&self, data: Option<&Value>);
}

pub struct HomeAssistant {
    base_url: String,
    token: String,
    client: reqwest::Client,
    entities_created: AtomicBool,
}

impl HomeAssistant {
    pub fn new(client: reqwest::Client, base_url: &str, token: &str) -> Self {
        HomeAssistant {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
            entities_created: AtomicBool::new(false),
        }
    }

    /// POST one entity state. True on 200/201.
    pub async fn set_state(&self, entity: &EntityState) -> bool {
        let url = format!("{}/api/states/{}", self.base_url, entity.entity_id);
        let result = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&entity.body())
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().as_u16() == 200 || resp.status().as_u16() == 201 => {
                debug!(entity = entity.entity_id, state = %entity.state, "entity updated");
                true
            }
            Ok(resp) => {
                error!(entity = entity.entity_id, status = %resp.status(), "failed to update entity");
                false
            }
            Err(e) => {
                error!(entity = entity.entity_id, error = %e, "error updating entity");
                false
            }
        }
    }

    async fn publish(&self, states: &[EntityState]) {
        for state in states {
            self.set_state(state).await;
        }
    }
}

#[async_trait]
impl StatePublisher for HomeAssistant {
    async fn create_entities(&self) {
        if self.entities_created.load(Ordering::SeqCst) {
            return;
        }
        self.publish(&entities::initial_entities()).await;
        self.entities_created.store(true, Ordering::SeqCst);
        info!("Home Assistant entities created");
    }

    async fn update_receiver_status(&self, online: bool, device: Option<&DeviceDescriptor>) {
        self.publish(&entities::receiver_status(online, device)).await;
    }

    async fn update_aircraft_data(&self, data: Option<&Value>) {
        let summary = data.map(AircraftSummary::from_payload);
        self.publish(&entities::aircraft_entities(summary.as_ref())).await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
