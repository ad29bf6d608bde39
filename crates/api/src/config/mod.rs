//! Server configuration module

use clap::Parser;

use crate::config::{
    observability::{LoggingConfig, ObservabilityConfig},
    server::ServerRuntimeConfig,
};

pub(crate) mod observability;
pub(crate) mod server;

/// Pulse API server configuration
#[derive(Debug, Parser)]
#[command(name = "pulse-api", about = "Pulse monitoring demo API server", long_about = None)]
pub(crate) struct ServerConfig {
    /// Server network settings.
    #[command(flatten)]
    pub(crate) server: ServerRuntimeConfig,

    /// Logging output settings.
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    /// Observability (traces/metrics) settings.
    #[command(flatten)]
    pub(crate) observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Load configuration from environment and CLI arguments
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be parsed
    pub(crate) fn load() -> Result<Self, clap::Error> {
        // Load .env file if present (ignore if missing)
        _ = dotenvy::dotenv();

        Self::try_parse()
    }

    /// Get the socket address for binding
    #[must_use]
    pub(crate) fn socket_addr(&self) -> String {
        self.server.socket_addr()
    }
}
