//! Gopher server
//!
//! Serves a directory tree over Gopher on plain TCP, TLS and QUIC.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client ──▶ net (tcp / tls / quic listeners)
//!                  │  selector bytes
//!                  ▼
//!              gopher::Application (decode, validate, map errors)
//!                  │  Request
//!                  ▼
//!              handlers (DirectoryHandler, PatternHandler, ...)
//!                  │  Response
//!                  ▼
//!              gopher::response (encode) ──▶ Client
//!
//!     Cross-cutting: config, observability, lifecycle
//! ```

use clap::Parser;
use std::path::PathBuf;

use gopher_server::config::{load_config, validate_config, ConfigError, ServerConfig};
use gopher_server::handlers::{DirectoryHandler, SignatureClassifier};
use gopher_server::lifecycle::{shutdown_signal, Shutdown};
use gopher_server::observability::{logging, metrics};
use gopher_server::{Application, GopherServer};

#[derive(Debug, Parser)]
#[command(name = "gopher-server", version)]
#[command(about = "Serve a directory over Gopher (TCP, TLS and QUIC)", long_about = None)]
struct Cli {
    /// Directory to serve; overrides directory.root
    base_path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Hostname written into generated menus
    #[arg(long)]
    hostname: Option<String>,

    /// Generate menus for directories instead of serving index files
    #[arg(long)]
    generate_menus: bool,

    /// Pick item types in generated menus from file signatures
    #[arg(long)]
    classify: bool,
}

impl Cli {
    fn apply(&self, config: &mut ServerConfig) {
        if let Some(path) = &self.base_path {
            config.directory.root = path.clone();
        }
        if let Some(hostname) = &self.hostname {
            config.hostname = hostname.clone();
        }
        config.directory.generate_menus |= self.generate_menus;
        config.directory.classify_content |= self.classify;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gopher-server starting");
    tracing::info!(
        hostname = %config.hostname,
        root = %config.directory.root.display(),
        generate_menus = config.directory.generate_menus,
        classify_content = config.directory.classify_content,
        listeners = config.listeners.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut handler = DirectoryHandler::new(&config.directory.root)?
        .with_generate_menus(config.directory.generate_menus);
    if config.directory.classify_content {
        handler = handler.with_classifier(SignatureClassifier);
    }
    let application = Application::new(handler);

    let server = GopherServer::bind(&config, application).await?;
    let shutdown = Shutdown::new();
    let serving = tokio::spawn(server.run(shutdown.subscribe()));

    shutdown_signal().await;
    shutdown.trigger();
    serving.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
