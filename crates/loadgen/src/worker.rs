//! Traffic worker loop.

use std::time::{Duration, Instant};

use rand::{Rng as _, seq::SliceRandom as _};
use reqwest::Client;
use tokio::time::sleep;
use tracing::{error, info};

const ENDPOINTS: [&str; 3] = ["/", "/api/data", "/health"];

/// Issues randomized requests forever: pick an endpoint, time the call,
/// log the outcome, sleep a random interval.
pub(crate) async fn run(worker_id: usize, client: Client, base_url: String) {
    loop {
        let endpoint = pick_endpoint();
        let url = request_url(&base_url, endpoint);
        let started = Instant::now();

        match client.get(&url).send().await {
            Ok(response) => {
                let status = response.status();
                let latency = started.elapsed().as_secs_f64();

                info!(worker_id, "Request to {endpoint} - Status: {status} - Latency: {latency:.3}s");
            }
            Err(request_error) => {
                error!(worker_id, "Request to {endpoint} failed: {request_error}");
            }
        }

        sleep(pause_duration()).await;
    }
}

fn pick_endpoint() -> &'static str {
    ENDPOINTS.choose(&mut rand::thread_rng()).copied().unwrap_or("/")
}

fn pause_duration() -> Duration {
    Duration::from_secs_f64(rand::thread_rng().gen_range(0.1..=1.0))
}

fn request_url(base_url: &str, endpoint: &str) -> String {
    format!("{}{endpoint}", base_url.trim_end_matches('/'))
}
