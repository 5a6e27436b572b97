//! The dashboard service: setup, the scan loop, and the faster update loop.
//!
//! Both loops share one `Scanner` (and therefore one detected-device slot)
//! and one `StatePublisher`. The scan loop re-targets nginx whenever it has a
//! device; the update loop only refreshes aircraft counts.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};

use adsb_dash_core::proxy::render_nginx_config;
use adsb_dash_core::{DashError, Options, Result};

use crate::homeassistant::StatePublisher;
use crate::scanner::Scanner;
use crate::updater::Tar1090Updater;

pub const NGINX_CONF: &str = "/etc/nginx/nginx.conf";

pub struct Service {
    options: Options,
    scanner: Arc<Scanner>,
    publisher: Arc<dyn StatePublisher>,
    updater: Tar1090Updater,
    nginx_conf: PathBuf,
}

impl Service {
    pub fn new(
        options: Options,
        scanner: Arc<Scanner>,
        publisher: Arc<dyn StatePublisher>,
        updater: Tar1090Updater,
        nginx_conf: PathBuf,
    ) -> Self {
        Service {
            options,
            scanner,
            publisher,
            updater,
            nginx_conf,
        }
    }

    /// Register entities, refresh tar1090, and write the initial nginx config.
    pub async fn setup(&self) -> Result<()> {
        info!("starting ADS-B dashboard service");
        self.publisher.create_entities().await;

        if self.options.update_tar1090 {
            info!("updating tar1090");
            if let Err(e) = self.updater.update().await {
                warn!(error = %e, "tar1090 update failed, continuing");
            }
        }

        if !self.updater.is_installed() {
            return Err(DashError::Update(format!(
                "tar1090 is not installed in {}",
                self.updater.html_dir().display()
            )));
        }

        self.write_nginx_config().await?;
        info!("service setup complete");
        Ok(())
    }

    /// Render nginx.conf for the current device and write it out.
    pub async fn write_nginx_config(&self) -> Result<()> {
        let html_dir = self.updater.html_dir().to_string_lossy();
        let device = self.scanner.detected_device();
        let conf = render_nginx_config(&html_dir, device.as_ref());
        tokio::fs::write(&self.nginx_conf, conf).await?;
        info!(path = %self.nginx_conf.display(), "nginx configuration written");
        Ok(())
    }

    /// One pass of the scan loop.
    pub async fn scan_once(&self) {
        let device = if let Some(manual) = self.options.manual_device() {
            info!(device = %manual, "using manual device");
            self.scanner.set_detected_device(manual.clone());
            Some(manual)
        } else if self.options.auto_detect {
            self.scanner.scan_network(None).await
        } else {
            None
        };

        match device {
            Some(device) => {
                self.publisher.update_receiver_status(true, Some(&device)).await;
                if let Err(e) = self.write_nginx_config().await {
                    error!(error = %e, "failed to write nginx configuration");
                }
                let data = self.scanner.get_aircraft_data().await;
                self.publisher.update_aircraft_data(data.as_ref()).await;
            }
            None => {
                self.publisher.update_receiver_status(false, None).await;
                self.publisher.update_aircraft_data(None).await;
            }
        }
    }

    /// One pass of the update loop. Publishes only when data came back.
    pub async fn update_once(&self) {
        if self.scanner.detected_device().is_none() {
            return;
        }
        if let Some(data) = self.scanner.get_aircraft_data().await {
            self.publisher.update_aircraft_data(Some(&data)).await;
        }
    }

    async fn scan_loop(&self) {
        let interval = self.options.scan_interval();
        loop {
            self.scan_once().await;
            tokio::time::sleep(interval).await;
        }
    }

    async fn update_loop(&self) {
        let interval = self.options.update_interval();
        loop {
            self.update_once().await;
            tokio::time::sleep(interval).await;
        }
    }

    /// Run both loops until `shutdown` resolves.
    ///
    /// Dropping the loops mid-scan cancels in-flight probes; the detected
    /// device is only written after a scan completes.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::select! {
            _ = self.scan_loop() => {}
            _ = self.update_loop() => {}
            _ = shutdown => info!("shutdown requested, stopping service"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::AircraftFetcher;
    use crate::probe::tests::{readsb_router, serve};
    use crate::probe::{http_client, HostProbe, ProbeOutcome};
    use adsb_dash_core::DeviceDescriptor;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Create,
        Status(bool, Option<DeviceDescriptor>),
        Aircraft(Option<Value>),
    }

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StatePublisher for Recorder {
        async fn create_entities(&self) {
            self.calls.lock().unwrap().push(Call::Create);
        }
        async fn update_receiver_status(&self, online: bool, device: Option<&DeviceDescriptor>) {
            self.calls.lock().unwrap().push(Call::Status(online, device.cloned()));
        }
        async fn update_aircraft_data(&self, data: Option<&Value>) {
            self.calls.lock().unwrap().push(Call::Aircraft(data.cloned()));
        }
    }

    struct NothingHere;

    #[async_trait]
    impl HostProbe for NothingHere {
        async fn probe_host(&self, _host: &str, _timeout: Duration) -> ProbeOutcome {
            ProbeOutcome::NotFound
        }
    }

    struct Fixture {
        service: Service,
        recorder: Arc<Recorder>,
        scanner: Arc<Scanner>,
        dir: tempfile::TempDir,
    }

    fn fixture(options: Options) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let timeout = Duration::from_millis(500);
        let fetcher = AircraftFetcher::new(http_client().unwrap(), timeout);
        let scanner = Arc::new(Scanner::with_probe(Arc::new(NothingHere), fetcher, timeout, 4));
        let recorder = Arc::new(Recorder::default());
        let service = Service::new(
            options,
            scanner.clone(),
            recorder.clone(),
            Tar1090Updater::new(dir.path().join("tar1090")),
            dir.path().join("nginx.conf"),
        );
        Fixture {
            service,
            recorder,
            scanner,
            dir,
        }
    }

    fn install_tar1090(dir: &tempfile::TempDir) {
        let html = dir.path().join("tar1090").join("html");
        std::fs::create_dir_all(&html).unwrap();
        std::fs::write(html.join("index.html"), "<html></html>").unwrap();
    }

    #[tokio::test]
    async fn test_manual_device_bypasses_scan() {
        let port = serve(readsb_router()).await;
        let options = Options {
            manual_host: "127.0.0.1".into(),
            manual_port: port,
            ..Options::default()
        };
        let f = fixture(options);

        f.service.scan_once().await;

        let manual = DeviceDescriptor::manual("127.0.0.1", port);
        assert_eq!(f.scanner.detected_device(), Some(manual.clone()));

        let calls = f.recorder.calls();
        assert_eq!(calls[0], Call::Status(true, Some(manual)));
        match &calls[1] {
            Call::Aircraft(Some(data)) => assert_eq!(data["now"], 123),
            other => panic!("unexpected call {other:?}"),
        }

        let conf = std::fs::read_to_string(f.dir.path().join("nginx.conf")).unwrap();
        assert!(conf.contains(&format!("proxy_pass http://127.0.0.1:{port}/data/;")));
    }

    #[tokio::test]
    async fn test_no_device_publishes_offline() {
        let f = fixture(Options {
            auto_detect: false,
            ..Options::default()
        });

        f.service.scan_once().await;

        assert_eq!(
            f.recorder.calls(),
            vec![Call::Status(false, None), Call::Aircraft(None)]
        );
    }

    #[tokio::test]
    async fn test_update_once_without_device_is_silent() {
        let f = fixture(Options::default());
        f.service.update_once().await;
        assert!(f.recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_once_publishes_data() {
        let port = serve(readsb_router()).await;
        let f = fixture(Options::default());
        f.scanner
            .set_detected_device(DeviceDescriptor::manual("127.0.0.1", port));

        f.service.update_once().await;

        let calls = f.recorder.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Aircraft(Some(_))));
    }

    #[tokio::test]
    async fn test_update_once_skips_tcp_device() {
        let f = fixture(Options::default());
        f.scanner.set_detected_device(DeviceDescriptor::tcp("127.0.0.1", 30005));
        f.service.update_once().await;
        assert!(f.recorder.calls().is_empty());
    }

    #[tokio::test]
    async fn test_setup_requires_tar1090() {
        let f = fixture(Options {
            update_tar1090: false,
            ..Options::default()
        });
        let err = f.service.setup().await.unwrap_err();
        assert!(matches!(err, DashError::Update(_)));
        assert_eq!(f.recorder.calls(), vec![Call::Create]);
    }

    #[tokio::test]
    async fn test_setup_writes_nginx_config() {
        let f = fixture(Options {
            update_tar1090: false,
            ..Options::default()
        });
        install_tar1090(&f.dir);

        f.service.setup().await.unwrap();

        let conf = std::fs::read_to_string(f.dir.path().join("nginx.conf")).unwrap();
        assert!(conf.contains("tar1090/html;"));
        assert!(!conf.contains("proxy_pass"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let f = fixture(Options {
            auto_detect: false,
            ..Options::default()
        });
        let stopped = tokio::time::timeout(
            Duration::from_secs(2),
            f.service.run(tokio::time::sleep(Duration::from_millis(50))),
        )
        .await;
        assert!(stopped.is_ok());
        assert!(f.recorder.calls().contains(&Call::Status(false, None)));
    }
}
