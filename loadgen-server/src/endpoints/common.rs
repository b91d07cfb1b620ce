//! Common types and utilities for API endpoints.

use std::error::Error;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for API operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Errors indicating malformed or illegal requests.
    #[error("client error: {0}")]
    Client(String),

    /// The server is already running as many workloads as it accepts.
    #[error("too many requests")]
    Throttled(#[source] loadgen_service::Error),

    /// The workload was aborted before it completed.
    #[error("service unavailable")]
    Unavailable(#[source] loadgen_service::Error),

    /// Server errors, indicating that something went wrong when receiving or executing a request.
    #[error("server error: {0}")]
    Server(#[source] Box<dyn Error + Send + Sync>),
}

impl From<loadgen_service::Error> for ApiError {
    fn from(err: loadgen_service::Error) -> Self {
        use loadgen_service::Error as E;

        match err {
            E::InvalidRequest(message) => ApiError::Client(message),
            E::AtCapacity => ApiError::Throttled(err),
            E::Timeout(_) => ApiError::Unavailable(err),
            E::Scratch { .. } | E::Task(_) => ApiError::Server(Box::new(err)),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// A JSON error response returned by the API.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiErrorResponse {
    /// The main error message.
    #[serde(default)]
    pub detail: Option<String>,
    /// Chain of error causes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
}

impl ApiErrorResponse {
    /// Creates an error response from an error, extracting the full cause chain.
    pub fn from_error<E: Error + ?Sized>(error: &E) -> Self {
        let detail = Some(error.to_string());

        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(s) = source {
            causes.push(s.to_string());
            source = s.source();
        }

        Self { detail, causes }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Client(_) => {
                tracing::debug!(error = &self as &dyn Error, "rejected request");
                StatusCode::BAD_REQUEST
            }
            ApiError::Throttled(_) => {
                tracing::debug!(error = &self as &dyn Error, "throttled request");
                StatusCode::TOO_MANY_REQUESTS
            }
            ApiError::Unavailable(_) => {
                tracing::warn!(error = &self as &dyn Error, "aborted request");
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::Server(_) => {
                tracing::error!(error = &self as &dyn Error, "error handling request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ApiErrorResponse::from_error(&self);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn status_of(err: loadgen_service::Error) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn maps_service_errors() {
        use loadgen_service::Error as E;

        assert_eq!(
            status_of(E::InvalidRequest("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(E::AtCapacity), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(E::Timeout(Duration::from_secs(1))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(E::Scratch {
                operation: "append",
                source: std::io::ErrorKind::StorageFull.into(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_contains_cause_chain() {
        let err = ApiError::from(loadgen_service::Error::Scratch {
            operation: "read",
            source: std::io::Error::other("disk on fire"),
        });

        let body = ApiErrorResponse::from_error(&err);
        assert_eq!(
            body.detail.as_deref(),
            Some("server error: scratch file read failed")
        );
        assert_eq!(body.causes, ["scratch file read failed", "disk on fire"]);
    }
}
