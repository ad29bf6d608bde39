//! State

use std::sync::Arc;

use crate::{
    observability::{LogEmitter, Metrics},
    random::RandomSource,
};

/// Process-wide instruments handed to the middleware and handlers.
///
/// Each member provides its own internal synchronization; request code
/// never takes explicit locks.
pub(crate) struct State {
    pub(crate) metrics: Metrics,
    pub(crate) emitter: LogEmitter,
    pub(crate) random: Arc<dyn RandomSource>,
}

impl State {
    #[must_use]
    pub(crate) fn new(metrics: Metrics, emitter: LogEmitter, random: Arc<dyn RandomSource>) -> Self {
        Self {
            metrics,
            emitter,
            random,
        }
    }

    #[must_use]
    pub(crate) fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
