//! dispatch-trace agent binary.
//!
//! Loads configuration, installs logging and metrics, serves the traced
//! dispatcher and watches the config file for changes.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use dispatch_trace::config::{load_config, AgentConfig, ConfigWatcher};
use dispatch_trace::lifecycle::Shutdown;
use dispatch_trace::observability::{logging, metrics};
use dispatch_trace::HttpServer;

#[derive(Parser)]
#[command(name = "dispatch-trace")]
#[command(about = "HTTP dispatcher with distributed trace propagation", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when absent.
    #[arg(short, long, env = "DISPATCH_TRACE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => AgentConfig::default(),
    };

    logging::init_logging(&config.observability)?;

    tracing::info!("dispatch-trace v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        application_name = %config.trace.application_name,
        sampling_rate = config.trace.sampling_rate,
        request_timeout_secs = config.timeouts.request_secs,
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

    // the watcher must outlive the server
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (Some(watcher.spawn()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
