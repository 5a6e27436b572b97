//! Per-host receiver probe.
//!
//! Walks a fixed port list. Raw-feed ports get a bare TCP connect; web ports
//! get a GET of each known aircraft.json path. Every network failure is a
//! non-match, never an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::net::TcpStream;
use tracing::debug;

use adsb_dash_core::classify::{self, AIRCRAFT_PATHS, HTTP_PORTS, RAW_PORTS};
use adsb_dash_core::{DashError, DeviceDescriptor, Result};

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of probing one host.
///
/// `Failed` is kept apart from `NotFound` for logging only; the scanner
/// treats both as "no device here".
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Found(DeviceDescriptor),
    NotFound,
    Failed(String),
}

/// Probes a single host for a receiver.
#[async_trait]
pub trait HostProbe: Send + Sync {
    async fn probe_host(&self, host: &str, timeout: Duration) -> ProbeOutcome;
}

// ---------------------------------------------------------------------------
// Probe plan
// ---------------------------------------------------------------------------

/// Which ports to try, in order, and which of them speak HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbePlan {
    pub ports: Vec<u16>,
    pub http_ports: Vec<u16>,
}

impl Default for ProbePlan {
    fn default() -> Self {
        ProbePlan {
            ports: RAW_PORTS.iter().chain(HTTP_PORTS).copied().collect(),
            http_ports: HTTP_PORTS.to_vec(),
        }
    }
}

impl ProbePlan {
    fn is_http(&self, port: u16) -> bool {
        self.http_ports.contains(&port)
    }
}

// ---------------------------------------------------------------------------
// Network probe
// ---------------------------------------------------------------------------

/// HTTP client for LAN traffic. Proxy settings from the environment are
/// ignored; receivers are always dialled directly.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .map_err(|e| DashError::Http(e.to_string()))
}

/// The real probe: TCP connects and HTTP GETs.
pub struct NetworkProbe {
    client: reqwest::Client,
    plan: ProbePlan,
}

impl NetworkProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_plan(client, ProbePlan::default())
    }

    pub fn with_plan(client: reqwest::Client, plan: ProbePlan) -> Self {
        NetworkProbe { client, plan }
    }

    /// True if a TCP connection to `host:port` succeeds within `timeout`.
    ///
    /// The stream is dropped immediately; nothing is read or written.
    async fn check_tcp_port(&self, host: &str, port: u16, timeout: Duration) -> bool {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => true,
            Ok(Err(e)) => {
                debug!(host, port, error = %e, "tcp port closed");
                false
            }
            Err(_) => {
                debug!(host, port, "tcp connect timed out");
                false
            }
        }
    }

    /// First aircraft.json path on `host:port` that answers with the right shape.
    async fn check_http_endpoint(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Option<DeviceDescriptor> {
        for path in AIRCRAFT_PATHS {
            let url = format!("http://{host}:{port}{path}");
            let Some(payload) = self.get_json(&url, timeout).await else {
                continue;
            };
            if !classify::is_aircraft_payload(&payload) {
                debug!(%url, "response is not aircraft.json");
                continue;
            }
            let device_type = classify::classify(path, &payload);
            return Some(DeviceDescriptor::http(host, port, device_type, path));
        }
        None
    }

    async fn get_json(&self, url: &str, timeout: Duration) -> Option<Value> {
        let resp = match self.client.get(url).timeout(timeout).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(%url, error = %e, "http probe failed");
                return None;
            }
        };
        if resp.status() != StatusCode::OK {
            debug!(%url, status = %resp.status(), "http probe non-200");
            return None;
        }
        match resp.json::<Value>().await {
            Ok(v) => Some(v),
            Err(e) => {
                debug!(%url, error = %e, "http probe body is not JSON");
                None
            }
        }
    }

    /// An open raw port: prefer the host's web interface, else assume a
    /// dump1090-family raw feed.
    async fn identify_raw_port(&self, host: &str, raw_port: u16, timeout: Duration) -> DeviceDescriptor {
        for &port in &self.plan.http_ports {
            if let Some(device) = self.check_http_endpoint(host, port, timeout).await {
                return device.with_raw_port(raw_port);
            }
        }
        DeviceDescriptor::tcp(host, raw_port)
    }
}

#[async_trait]
impl HostProbe for NetworkProbe {
    async fn probe_host(&self, host: &str, timeout: Duration) -> ProbeOutcome {
        for &port in &self.plan.ports {
            if self.plan.is_http(port) {
                if let Some(device) = self.check_http_endpoint(host, port, timeout).await {
                    return ProbeOutcome::Found(device);
                }
            } else if self.check_tcp_port(host, port, timeout).await {
                return ProbeOutcome::Found(self.identify_raw_port(host, port, timeout).await);
            }
        }
        ProbeOutcome::NotFound
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use adsb_dash_core::{DeviceType, Transport};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_millis(500);

    impl ProbeOutcome {
        fn into_device(self) -> Option<DeviceDescriptor> {
            match self {
                ProbeOutcome::Found(d) => Some(d),
                ProbeOutcome::NotFound | ProbeOutcome::Failed(_) => None,
            }
        }
    }

    /// Serve `router` on an ephemeral localhost port.
    pub(crate) async fn serve(router: Router) -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        port
    }

    /// A localhost port with nothing listening.
    pub(crate) fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    pub(crate) fn readsb_router() -> Router {
        Router::new().route(
            "/data/aircraft.json",
            get(|| async { Json(json!({"aircraft": [{"lat": 1, "lon": 2}], "now": 123})) }),
        )
    }

    /// A localhost port that accepts connections and never answers.
    pub(crate) async fn silent_port() -> u16 {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        port
    }

    fn probe(ports: Vec<u16>, http_ports: Vec<u16>) -> NetworkProbe {
        NetworkProbe::with_plan(http_client().unwrap(), ProbePlan { ports, http_ports })
    }

    #[test]
    fn test_default_plan() {
        let plan = ProbePlan::default();
        assert_eq!(plan.ports, vec![30002, 30003, 30005, 30104, 8080, 8081, 80]);
        assert!(plan.is_http(8081));
        assert!(!plan.is_http(30005));
    }

    #[tokio::test]
    async fn test_http_receiver_detected() {
        let http = serve(readsb_router()).await;
        let p = probe(vec![closed_port(), http], vec![http]);

        let outcome = p.probe_host("127.0.0.1", TIMEOUT).await;
        assert_eq!(
            outcome,
            ProbeOutcome::Found(DeviceDescriptor::http(
                "127.0.0.1",
                http,
                DeviceType::Readsb,
                "/data/aircraft.json"
            ))
        );
    }

    #[tokio::test]
    async fn test_raw_port_without_web_interface() {
        let raw = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let raw_port = raw.local_addr().unwrap().port();
        let closed = closed_port();
        let p = probe(vec![raw_port, closed], vec![closed]);

        let device = p.probe_host("127.0.0.1", TIMEOUT).await.into_device().unwrap();
        assert_eq!(device, DeviceDescriptor::tcp("127.0.0.1", raw_port));
        assert_eq!(device.transport(), Transport::Tcp);
        assert!(device.endpoint().is_none());
    }

    #[tokio::test]
    async fn test_raw_port_corroborated_by_web_interface() {
        let raw = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let raw_port = raw.local_addr().unwrap().port();
        let http = serve(readsb_router()).await;
        let p = probe(vec![raw_port, http], vec![http]);

        let device = p.probe_host("127.0.0.1", TIMEOUT).await.into_device().unwrap();
        assert_eq!(device.transport(), Transport::Http);
        assert_eq!(device.port(), http);
        assert_eq!(device.raw_port(), Some(raw_port));
    }

    #[tokio::test]
    async fn test_falls_through_to_later_path() {
        let router = Router::new()
            .route("/data/aircraft.json", get(|| async { AxumStatus::NOT_FOUND }))
            .route(
                "/tar1090/data/aircraft.json",
                get(|| async { Json(json!({"now": 1.0, "aircraft": [], "version": "readsb-x"})) }),
            );
        let http = serve(router).await;
        let p = probe(vec![http], vec![http]);

        let device = p.probe_host("127.0.0.1", TIMEOUT).await.into_device().unwrap();
        assert_eq!(device.device_type(), &DeviceType::Tar1090);
        assert_eq!(device.endpoint(), Some("/tar1090/data/aircraft.json"));
    }

    #[tokio::test]
    async fn test_version_field_labels_device() {
        let router = Router::new().route(
            "/data/aircraft.json",
            get(|| async { Json(json!({"now": 1.0, "aircraft": [], "version": "dump1090-fa 9.0"})) }),
        );
        let http = serve(router).await;
        let p = probe(vec![http], vec![http]);

        let device = p.probe_host("127.0.0.1", TIMEOUT).await.into_device().unwrap();
        assert_eq!(device.device_type(), &DeviceType::Other("dump1090-fa 9.0".into()));
    }

    #[tokio::test]
    async fn test_wrong_shape_and_bad_json_are_non_matches() {
        let router = Router::new()
            .route("/data/aircraft.json", get(|| async { Json(json!({"status": "ok"})) }))
            .route("/tar1090/data/aircraft.json", get(|| async { "not json" }))
            .route("/skyaware/data/aircraft.json", get(|| async { Json(json!([1, 2, 3])) }));
        let http = serve(router).await;
        let p = probe(vec![http], vec![http]);

        assert_eq!(p.probe_host("127.0.0.1", TIMEOUT).await, ProbeOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_unresponsive_web_port_times_out() {
        let silent = silent_port().await;
        let p = probe(vec![silent], vec![silent]);
        let timeout = Duration::from_millis(200);

        let started = std::time::Instant::now();
        assert_eq!(p.probe_host("127.0.0.1", timeout).await, ProbeOutcome::NotFound);

        let budget = timeout * AIRCRAFT_PATHS.len() as u32;
        assert!(started.elapsed() < budget + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_http_client_reaches_lan_directly() {
        let http = serve(readsb_router()).await;
        let client = http_client().unwrap();
        let resp = client
            .get(format!("http://127.0.0.1:{http}/data/aircraft.json"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_all_ports_closed() {
        let p = probe(vec![closed_port(), closed_port()], vec![]);
        assert_eq!(p.probe_host("127.0.0.1", TIMEOUT).await, ProbeOutcome::NotFound);
    }

    #[test]
    fn test_outcome_into_device() {
        let d = DeviceDescriptor::tcp("10.0.0.8", 30005);
        assert_eq!(ProbeOutcome::Found(d.clone()).into_device(), Some(d));
        assert_eq!(ProbeOutcome::NotFound.into_device(), None);
        assert_eq!(ProbeOutcome::Failed("boom".into()).into_device(), None);
    }
}
