//! pilah-scan - Waste Classification Service
//!
//! Serves the classification pipeline to a browser UI over HTTP + SSE.
//! The model loads in the background; the server accepts requests right
//! away and answers `MODEL_NOT_READY` until loading finishes.

use anyhow::{Context, Result};
use clap::Parser;
use pilah_common::config::{load_toml_config_or_default, locate_config_file, LoggingConfig};
use pilah_common::events::EventBus;
use pilah_common::CredentialStore;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pilah_scan::capture::FfmpegBackend;
use pilah_scan::config::{ConfigOverrides, ScanConfig, MODULE_NAME};
use pilah_scan::inference::{file_loader, ModelSlot};
use pilah_scan::reporter::{Reporter, ScoringClient};
use pilah_scan::{AppState, Scanner};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "pilah-scan")]
#[command(about = "Waste classification service", long_about = None)]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the ONNX classification model
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Scoring backend API root
    #[arg(long)]
    api_url: Option<String>,

    /// Camera device path or index
    #[arg(long)]
    camera: Option<String>,

    /// Credential store file
    #[arg(long)]
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Read config before tracing is up; report problems once it is
    let config_path = locate_config_file(args.config.as_deref(), MODULE_NAME);
    let (toml_config, config_file) = load_toml_config_or_default(config_path.as_deref());

    init_tracing(&toml_config.logging)?;

    info!("Starting pilah-scan (Waste Classification) service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    config_file.log();

    let config = ScanConfig::resolve(
        ConfigOverrides {
            port: args.port,
            model_path: args.model,
            api_url: args.api_url,
            camera_device: args.camera,
            credentials_path: args.credentials,
        },
        &toml_config,
    );

    let event_bus = EventBus::new(100);

    let client = ScoringClient::new(&config.api_url).context("Failed to create scoring client")?;
    let reporter = Reporter::new(
        Arc::new(client),
        CredentialStore::new(&config.credentials_path),
        event_bus.clone(),
    );

    let scanner = Arc::new(Scanner::new(
        Box::new(FfmpegBackend::new(config.camera_device.clone())),
        ModelSlot::new(),
        reporter,
        event_bus,
    ));

    // Load the model in the background
    let loader = file_loader(config.model_path.clone());
    {
        let scanner = Arc::clone(&scanner);
        let loader = Arc::clone(&loader);
        tokio::spawn(async move {
            let _ = scanner.load_model(move || loader()).await;
        });
    }

    let app = pilah_scan::build_router(AppState::new(Arc::clone(&scanner), loader));

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    scanner.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Console logging plus an optional log file
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            EnvFilter::try_new(format!(
                "pilah_scan={0},pilah_common={0},tower_http={0}",
                logging.level
            ))
        })
        .unwrap_or_else(|_| EnvFilter::new("pilah_scan=info,tower_http=info"));

    let file_layer = match &logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
