//! Pulse synthetic traffic generator.
//!
//! Drives continuous randomized requests against the demo API from
//! multiple concurrent workers.

use std::{io, process, time::Duration};

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod worker;

/// Pulse traffic generator configuration
#[derive(Debug, Parser)]
#[command(name = "pulse-loadgen", about = "Pulse synthetic traffic generator", long_about = None)]
struct GeneratorConfig {
    /// Base URL of the service under load.
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Number of concurrent traffic workers.
    #[arg(short, long, env = "WORKERS", default_value_t = 5)]
    workers: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 10)]
    request_timeout_seconds: u64,
}

#[tokio::main]
async fn main() {
    _ = dotenvy::dotenv();

    let config = GeneratorConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_seconds))
        .build()
    {
        Ok(client) => client,
        Err(build_error) => {
            error!("failed to build HTTP client: {build_error}");

            process::exit(1);
        }
    };

    info!("Starting traffic simulation against {}", config.base_url);

    for worker_id in 1..=config.workers {
        let client = client.clone();
        let base_url = config.base_url.clone();

        tokio::spawn(worker::run(worker_id, client, base_url));

        info!("Started traffic worker {worker_id}");
    }

    // Workers are daemon-style: returning drops the runtime and with it
    // every loop; pending requests are bounded by the client timeout.
    if let Err(signal_error) = shutdown_signal().await {
        error!("failed to listen for shutdown signal: {signal_error}");

        return;
    }

    info!("Stopping traffic simulation");
}

async fn shutdown_signal() -> io::Result<()> {
    let ctrl_c = async { tokio::signal::ctrl_c().await };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?
            .recv()
            .await;

        Ok(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<()>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
