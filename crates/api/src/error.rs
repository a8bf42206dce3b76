//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::CheckoutError;
use domain::{DomainError, ErrorKind};
use projections::ProjectionError;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
///
/// Every body has the shape `{"error": message, "kind": kind}`; a partial
/// checkout failure also carries the `order_id` that already exists.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or malformed caller identity headers.
    #[error("{0}")]
    Unauthenticated(String),

    /// Malformed path or query input.
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

impl ApiError {
    /// Coarse kind of the failure; `None` for the identity check, which
    /// happens before any domain call.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ApiError::Unauthenticated(_) => None,
            ApiError::BadRequest(_) => Some(ErrorKind::InvalidInput),
            ApiError::Domain(err) => Some(err.kind()),
            ApiError::Checkout(err) => Some(err.kind()),
            ApiError::Projection(err) => Some(err.kind()),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind().map_or(StatusCode::UNAUTHORIZED, status_for)
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::EmptyCart
        | ErrorKind::MultiRestaurantCart
        | ErrorKind::ProductUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::IllegalTransition | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::PartialOrderFailure => StatusCode::BAD_GATEWAY,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind().map_or("unauthenticated", |k| k.as_str());
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(error = %message, kind, "request failed");
        } else {
            tracing::debug!(error = %message, kind, "request rejected");
        }

        let mut body = serde_json::json!({ "error": message, "kind": kind });
        if let ApiError::Checkout(err) = &self {
            if let Some(order_id) = err.order_id() {
                body["order_id"] = serde_json::json!(order_id);
            }
        }
        (status, axum::Json(body)).into_response()
    }
}
