//! adsb-dash-core: Pure logic for the ADS-B dashboard add-on.
//!
//! No async, no network I/O. Receiver classification, the device descriptor,
//! add-on options, aircraft statistics, Home Assistant entity payloads, and
//! nginx config rendering. Shared by the `adsb-dash` service binary.

pub mod classify;
pub mod entities;
pub mod options;
pub mod proxy;
pub mod subnet;
pub mod summary;
pub mod types;

// Re-export commonly used types at crate root
pub use classify::classify;
pub use options::{load_options, Options};
pub use summary::AircraftSummary;
pub use types::*;
