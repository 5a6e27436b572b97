//! adsb-dash: ADS-B receiver discovery and Home Assistant dashboard service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use adsb_dash_core::options::{self, DEFAULT_OPTIONS_PATH};
use adsb_dash_core::{AircraftSummary, DeviceDescriptor, Options};

mod fetcher;
mod homeassistant;
mod probe;
mod scanner;
mod service;
mod updater;

use fetcher::AircraftFetcher;
use homeassistant::{HomeAssistant, DEFAULT_HA_URL};
use probe::http_client;
use scanner::Scanner;
use service::{Service, NGINX_CONF};
use updater::{Tar1090Updater, TAR1090_DIR};

#[derive(Parser)]
#[command(
    name = "adsb-dash",
    version,
    about = "ADS-B receiver discovery and dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the dashboard service (scan, poll, publish)
    Run {
        /// Add-on options file
        #[arg(long, env = "ADSB_DASH_OPTIONS", default_value = DEFAULT_OPTIONS_PATH)]
        options: PathBuf,

        /// Supervisor API token
        #[arg(long, env = "SUPERVISOR_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Home Assistant core API base URL
        #[arg(long, default_value = DEFAULT_HA_URL)]
        ha_url: String,

        /// tar1090 install directory
        #[arg(long, default_value = TAR1090_DIR)]
        tar1090_dir: PathBuf,

        /// nginx configuration file to generate
        #[arg(long, default_value = NGINX_CONF)]
        nginx_conf: PathBuf,
    },

    /// Scan the local network once and print what was found
    Scan {
        /// Only probe this host
        #[arg(long)]
        host: Option<String>,

        /// Per-probe timeout in seconds
        #[arg(long, default_value = "2")]
        timeout: u64,

        /// Maximum hosts probed at once
        #[arg(long, default_value = "254")]
        concurrency: usize,

        /// Log level
        #[arg(long, default_value = "info")]
        log_level: String,

        /// Print the device as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Fetch aircraft.json from a receiver and print a summary
    Fetch {
        #[arg(long)]
        host: String,

        #[arg(long, default_value = "8080")]
        port: u16,

        /// aircraft.json path on the receiver
        #[arg(long, default_value = adsb_dash_core::DEFAULT_ENDPOINT)]
        endpoint: String,

        /// Request timeout in seconds
        #[arg(long, default_value = "2")]
        timeout: u64,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            options,
            token,
            ha_url,
            tar1090_dir,
            nginx_conf,
        } => cmd_run(options, token, &ha_url, tar1090_dir, nginx_conf).await,
        Commands::Scan {
            host,
            timeout,
            concurrency,
            log_level,
            json,
        } => {
            let opts = Options {
                log_level,
                ..Options::default()
            };
            init_logging(&opts);
            cmd_scan(host.as_deref(), timeout, concurrency, json).await
        }
        Commands::Fetch {
            host,
            port,
            endpoint,
            timeout,
            json,
        } => {
            init_logging(&Options::default());
            cmd_fetch(&host, port, &endpoint, timeout, json).await
        }
    }
}

/// `RUST_LOG` wins; otherwise the add-on's `log_level`.
fn init_logging(opts: &Options) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.log_filter())),
        )
        .init();
}

async fn cmd_run(
    options_path: PathBuf,
    token: Option<String>,
    ha_url: &str,
    tar1090_dir: PathBuf,
    nginx_conf: PathBuf,
) {
    let (opts, load_err) = match options::load_options(&options_path) {
        Ok(o) => (o, None),
        Err(e) => (Options::default(), Some(e)),
    };
    init_logging(&opts);
    if let Some(e) = load_err {
        error!(error = %e, "could not load options, using defaults");
    }

    let Some(token) = token.filter(|t| !t.is_empty()) else {
        error!("SUPERVISOR_TOKEN not found");
        std::process::exit(1);
    };

    let client = lan_client_or_exit();
    let scanner = Arc::new(Scanner::new(
        client.clone(),
        opts.probe_timeout(),
        opts.scan_concurrency(),
    ));
    let publisher = Arc::new(HomeAssistant::new(client, ha_url, &token));
    let service = Service::new(
        opts,
        scanner,
        publisher,
        Tar1090Updater::new(tar1090_dir),
        nginx_conf,
    );

    if let Err(e) = service.setup().await {
        error!(error = %e, "service setup failed");
        std::process::exit(1);
    }

    service.run(shutdown_signal()).await;
    info!("service stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn lan_client_or_exit() -> reqwest::Client {
    match http_client() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn cmd_scan(host: Option<&str>, timeout: u64, concurrency: usize, json: bool) {
    let scanner = Scanner::new(
        lan_client_or_exit(),
        Duration::from_secs(timeout.max(1)),
        concurrency,
    );

    let Some(device) = scanner.scan_network(host).await else {
        eprintln!("No ADS-B receiver found");
        std::process::exit(1);
    };

    if json {
        print_json(&device);
    } else {
        print_device(&device);
    }
}

async fn cmd_fetch(host: &str, port: u16, endpoint: &str, timeout: u64, json: bool) {
    let device = DeviceDescriptor::http(host, port, adsb_dash_core::DeviceType::Manual, endpoint);
    let fetcher = AircraftFetcher::new(lan_client_or_exit(), Duration::from_secs(timeout.max(1)));

    let Some(data) = fetcher.fetch(&device).await else {
        eprintln!("No aircraft data from {}", device.location());
        std::process::exit(1);
    };

    let summary = AircraftSummary::from_payload(&data);
    if json {
        print_json(&summary);
        return;
    }
    println!();
    println!("Receiver: {}", device.data_url().unwrap_or_default());
    println!("  Aircraft:       {}", summary.total);
    println!("  With position:  {}", summary.with_position);
    println!("  Messages:       {}", summary.message_rate);
    println!();
}

fn print_device(device: &DeviceDescriptor) {
    let mut table = Table::new();
    table.set_header(vec!["Host", "Port", "Type", "Transport", "Endpoint", "Raw port"]);
    table.add_row(vec![
        Cell::new(device.host()),
        Cell::new(device.port()),
        Cell::new(device.device_type()),
        Cell::new(device.transport()),
        Cell::new(device.endpoint().unwrap_or("-")),
        Cell::new(
            device
                .raw_port()
                .map(|p| p.to_string())
                .unwrap_or("-".into()),
        ),
    ]);
    println!("{table}");
}
