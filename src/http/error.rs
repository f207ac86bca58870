//! HTTP error envelope.
//!
//! Every handler error collapses to `{"message": ..., "code": <status>}`.
//! Status codes are chosen here and nowhere else.

use axum::Json;
use axum::http::header::{CONTENT_RANGE, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use super::auth::AuthError;
use crate::delivery::{DeliveryError, DeliveryErrorKind};

/// Handler-level error.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    message: String,
    code: u16,
}

/// Status code for a delivery error kind.
pub fn status_for(kind: DeliveryErrorKind) -> StatusCode {
    match kind {
        DeliveryErrorKind::Forbidden => StatusCode::FORBIDDEN,
        DeliveryErrorKind::NotFound => StatusCode::NOT_FOUND,
        DeliveryErrorKind::InvalidRange => StatusCode::RANGE_NOT_SATISFIABLE,
        DeliveryErrorKind::StreamFailure | DeliveryErrorKind::PersistenceFailure => {
            StatusCode::INTERNAL_SERVER_ERROR
        },
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Delivery(err) => status_for(err.kind()),
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl AppError {
    /// Message shown to clients. Filesystem paths and I/O details stay in
    /// the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Delivery(DeliveryError::NotFound { .. }) => "file not found".to_string(),
            Self::Delivery(DeliveryError::Forbidden { .. }) => "access denied".to_string(),
            err if err.status().is_server_error() => "internal server error".to_string(),
            err => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = ErrorBody {
            message: self.public_message(),
            code: status.as_u16(),
        };
        let mut response = (status, Json(body)).into_response();

        if let Self::Delivery(DeliveryError::InvalidRange { file_size, .. }) = &self
            && let Ok(value) = HeaderValue::from_str(&format!("bytes */{file_size}"))
        {
            response.headers_mut().insert(CONTENT_RANGE, value);
        }

        response
    }
}
