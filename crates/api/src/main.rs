//! Pulse monitoring demo API server.

use std::{process, sync::Arc};

use salvo::prelude::*;
use salvo::{affix_state::inject, trailing_slash::remove_slash};
use tracing::{error, info};

use crate::{
    config::ServerConfig,
    observability::{LogEmitter, Metrics, Observability, metrics_handler, observe_request},
    random::ThreadRngSource,
    state::State,
};

mod config;
mod data;
mod errors;
mod extensions;
mod health;
mod hello;
mod observability;
mod random;
mod shutdown;
mod state;
#[cfg(test)]
mod test_helpers;

/// Pulse API server entry point
#[tokio::main]
async fn main() {
    // Load configuration from .env and CLI arguments
    let config = ServerConfig::load().unwrap_or_else(|e| {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln for config errors"
        )]
        {
            eprintln!("Configuration error: {e}");
        }

        process::exit(1);
    });

    let observability = match Observability::init(&config) {
        Ok(observability) => observability,
        Err(init_error) => {
            #[expect(
                clippy::print_stderr,
                reason = "the subscriber may not have been installed"
            )]
            {
                eprintln!("Observability error: {init_error}");
            }

            process::exit(1);
        }
    };

    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(source) => {
            error!("failed to build metrics registry: {source}");

            process::exit(1);
        }
    };

    let emitter = LogEmitter::new("pulse_api", &config.logging.log_file);
    let state = State::new(metrics, emitter, Arc::new(ThreadRngSource)).into_shared();

    let addr = config.socket_addr();

    info!("Starting server on {addr}");

    // Bind server
    let listener = TcpListener::new(addr).bind().await;

    let router = Router::new()
        .hoop(CatchPanic::new())
        .hoop(remove_slash())
        .hoop(inject(state))
        .hoop(observe_request)
        .get(hello::handler)
        .push(Router::with_path("health").get(health::handler))
        .push(Router::with_path("metrics").get(metrics_handler))
        .push(
            Router::with_path("api")
                .push(Router::with_path("data").get(data::handler))
                .push(Router::with_path("error-test").get(error_test::handler)),
        );

    let server = Server::new(listener);

    let handle = server.handle();

    // Listen for shutdown signal
    tokio::spawn(async move {
        if let Err(listen_error) = shutdown::listen(handle).await {
            error!("failed to listen for shutdown signal: {listen_error}");
        }
    });

    // Start serving requests
    server.serve(router).await;

    // Flush spans still queued in the batch exporter
    observability.shutdown();
}
