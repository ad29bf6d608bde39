//! Request error taxonomy.

use salvo::{Depot, Request, Response, Writer, async_trait, http::StatusCode, writing::Json};
use serde::Serialize;
use thiserror::Error;

/// Depot key under which the error writer records the request outcome for
/// the observability middleware.
pub(crate) const OUTCOME_DEPOT_KEY: &str = "request_outcome";

const OPAQUE_FAULT_DETAIL: &str = "Internal server error";

/// How a completed request is classified by the observability middleware.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    /// A classified error with an intentional, user-facing status and detail.
    HttpError {
        /// Status surfaced to the client.
        status: StatusCode,
        /// Detail surfaced to the client.
        detail: String,
    },

    /// An unclassified fault; the message never reaches the client.
    Fault {
        /// Internal fault message, preserved in logs and spans only.
        message: String,
    },
}

/// Error type returned by request handlers.
///
/// Classified errors pass through to the client unchanged; faults are
/// replaced with an opaque 500 response.
#[derive(Debug, Error)]
pub(crate) enum ApiError {
    /// Deliberately surfaced to the client with a specific status and detail.
    #[error("{detail}")]
    Classified {
        /// Status surfaced to the client.
        status: StatusCode,
        /// Detail surfaced to the client.
        detail: String,
    },

    /// Any other raised condition.
    #[error("{message}")]
    Fault {
        /// Internal fault message.
        message: String,
    },
}

impl ApiError {
    pub(crate) fn classified(status: StatusCode, detail: impl Into<String>) -> Self {
        Self::Classified {
            status,
            detail: detail.into(),
        }
    }

    pub(crate) fn fault(message: impl Into<String>) -> Self {
        Self::Fault {
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

#[async_trait]
impl Writer for ApiError {
    async fn write(self, _req: &mut Request, depot: &mut Depot, res: &mut Response) {
        match self {
            Self::Classified { status, detail } => {
                depot.insert(
                    OUTCOME_DEPOT_KEY,
                    Outcome::HttpError {
                        status,
                        detail: detail.clone(),
                    },
                );

                res.status_code(status);
                res.render(Json(ErrorBody { detail }));
            }
            Self::Fault { message } => {
                depot.insert(OUTCOME_DEPOT_KEY, Outcome::Fault { message });

                res.status_code(StatusCode::INTERNAL_SERVER_ERROR);
                res.render(Json(ErrorBody {
                    detail: OPAQUE_FAULT_DETAIL.to_owned(),
                }));
            }
        }
    }
}
