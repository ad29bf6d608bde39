//! Depot helper extensions.

use std::any::Any;

use salvo::Depot;

use crate::errors::{ApiError, OUTCOME_DEPOT_KEY, Outcome};

/// Helpers for request-scoped depot state.
pub(crate) trait DepotExt {
    /// Obtains injected state, mapping absence to an unclassified fault.
    fn obtain_or_fault<T: Any + Send + Sync>(&self) -> Result<&T, ApiError>;

    /// Reads the outcome recorded by an error writer, if any.
    fn request_outcome(&self) -> Option<Outcome>;
}

impl DepotExt for Depot {
    fn obtain_or_fault<T: Any + Send + Sync>(&self) -> Result<&T, ApiError> {
        self.obtain::<T>()
            .map_err(|_ignored| ApiError::fault("application state missing from depot"))
    }

    fn request_outcome(&self) -> Option<Outcome> {
        self.get::<Outcome>(OUTCOME_DEPOT_KEY).ok().cloned()
    }
}
