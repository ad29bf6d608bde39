//! Test helpers.

use std::{io, path::PathBuf, sync::Arc};

use salvo::{Router, Service, affix_state::inject};
use tempfile::TempDir;

use crate::{
    observability::{LogEmitter, Metrics, observe_request},
    random::MockRandomSource,
    state::State,
};

/// State built around a mocked random source, an isolated metrics registry,
/// and a tempdir-backed log sink.
pub(crate) struct TestContext {
    pub(crate) state: Arc<State>,
    pub(crate) log_path: PathBuf,
    _log_dir: TempDir,
}

pub(crate) fn test_context(random: MockRandomSource) -> io::Result<TestContext> {
    let log_dir = tempfile::tempdir()?;
    let log_path = log_dir.path().join("app.log");

    let metrics = Metrics::new().map_err(io::Error::other)?;
    let emitter = LogEmitter::new("pulse_api", &log_path);
    let state = State::new(metrics, emitter, Arc::new(random)).into_shared();

    Ok(TestContext {
        state,
        log_path,
        _log_dir: log_dir,
    })
}

/// Mock that rejects every use of randomness.
pub(crate) fn strict_random() -> MockRandomSource {
    let mut random = MockRandomSource::new();

    random.expect_chance().never();
    random.expect_sample_delay().never();
    random.expect_choose().never();

    random
}

/// Service with injected state but no observability middleware.
pub(crate) fn service_with_state(state: Arc<State>, route: Router) -> Service {
    Service::new(Router::new().hoop(inject(state)).push(route))
}

/// Service wrapped by the request observability middleware, as in
/// production.
pub(crate) fn observed_service(state: Arc<State>, route: Router) -> Service {
    Service::new(
        Router::new()
            .hoop(inject(state))
            .hoop(observe_request)
            .push(route),
    )
}
