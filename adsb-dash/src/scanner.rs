//! Subnet sweep for ADS-B receivers.
//!
//! The scanner fans a `HostProbe` out over every candidate host with a
//! bounded number in flight, joins them all, then picks the first hit in
//! submission order. It owns the single "detected device" slot that the
//! fetcher, the Home Assistant publisher, and the nginx writer read.

use std::any::Any;
use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use futures_util::FutureExt;
use serde_json::Value;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

use adsb_dash_core::subnet::subnet_hosts;
use adsb_dash_core::DeviceDescriptor;

use crate::fetcher::AircraftFetcher;
use crate::probe::{HostProbe, NetworkProbe, ProbeOutcome};

/// Public address used only to pick the outbound interface. No packet is sent.
const ROUTE_PROBE_ADDR: &str = "8.8.8.8:80";

// ---------------------------------------------------------------------------
// Host enumeration
// ---------------------------------------------------------------------------

/// Every host of the local /24, or nothing if the local address is unknown.
pub async fn enumerate_hosts() -> Vec<String> {
    match local_ipv4().await {
        Ok(local) => {
            debug!(%local, "scanning local /24");
            subnet_hosts(local).iter().map(ToString::to_string).collect()
        }
        Err(e) => {
            error!(error = %e, "failed to determine local subnet");
            Vec::new()
        }
    }
}

/// Source address the OS would use for outbound traffic.
async fn local_ipv4() -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(ROUTE_PROBE_ADDR).await?;
    match socket.local_addr()?.ip() {
        IpAddr::V4(v4) if !v4.is_unspecified() => Ok(v4),
        other => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("no usable IPv4 source address (got {other})"),
        )),
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct Scanner {
    probe: Arc<dyn HostProbe>,
    fetcher: AircraftFetcher,
    timeout: Duration,
    concurrency: usize,
    detected: RwLock<Option<DeviceDescriptor>>,
}

impl Scanner {
    /// Scanner using the real network probe and default port plan.
    pub fn new(client: reqwest::Client, timeout: Duration, concurrency: usize) -> Self {
        let probe = Arc::new(NetworkProbe::new(client.clone()));
        Self::with_probe(probe, AircraftFetcher::new(client, timeout), timeout, concurrency)
    }

    pub fn with_probe(
        probe: Arc<dyn HostProbe>,
        fetcher: AircraftFetcher,
        timeout: Duration,
        concurrency: usize,
    ) -> Self {
        Scanner {
            probe,
            fetcher,
            timeout,
            concurrency: concurrency.max(1),
            detected: RwLock::new(None),
        }
    }

    /// Scan `specific_host` alone, or the whole local /24.
    ///
    /// A hit replaces the detected device. A miss returns `None` and leaves
    /// the previous device in place.
    pub async fn scan_network(&self, specific_host: Option<&str>) -> Option<DeviceDescriptor> {
        let hosts = match specific_host {
            Some(h) => vec![h.to_string()],
            None => enumerate_hosts().await,
        };
        self.scan_hosts(hosts).await
    }

    /// Probe `hosts` and keep the first hit in list order.
    pub async fn scan_hosts(&self, hosts: Vec<String>) -> Option<DeviceDescriptor> {
        info!(hosts = hosts.len(), "scanning for ADS-B receivers");

        // `buffered` yields in submission order no matter which probe
        // finishes first. Probes are polled in place rather than spawned, so
        // dropping this future cancels every probe still in flight.
        let outcomes: Vec<ProbeOutcome> = stream::iter(hosts.iter().cloned())
            .map(|host| {
                let probe = Arc::clone(&self.probe);
                let timeout = self.timeout;
                async move {
                    AssertUnwindSafe(probe.probe_host(&host, timeout))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| ProbeOutcome::Failed(panic_message(&*panic)))
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut winner = None;
        for (host, outcome) in hosts.iter().zip(outcomes) {
            match outcome {
                ProbeOutcome::Found(device) => {
                    if winner.is_none() {
                        winner = Some(device);
                    } else {
                        debug!(host = %host, device = %device, "additional receiver ignored");
                    }
                }
                ProbeOutcome::NotFound => {}
                ProbeOutcome::Failed(cause) => {
                    warn!(host = %host, %cause, "probe task failed");
                }
            }
        }

        match winner {
            Some(device) => {
                info!(device = %device, "found ADS-B device");
                self.set_detected_device(device.clone());
                Some(device)
            }
            None => {
                warn!("no ADS-B devices found on network");
                None
            }
        }
    }

    /// Snapshot of the current device.
    pub fn detected_device(&self) -> Option<DeviceDescriptor> {
        self.detected
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_detected_device(&self, device: DeviceDescriptor) {
        *self.detected.write().unwrap_or_else(PoisonError::into_inner) = Some(device);
    }

    /// Live aircraft.json from the detected device, if it speaks HTTP.
    pub async fn get_aircraft_data(&self) -> Option<Value> {
        let device = self.detected_device()?;
        self.fetcher.fetch(&device).await
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "probe panicked".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
