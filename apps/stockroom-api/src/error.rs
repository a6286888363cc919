//! Error types for the API server.
//!
//! Every failure leaves the server as `{"code": ..., "message": ...}` with
//! the status below.
//!
//! | Error                                   | Status | code                 |
//! |-----------------------------------------|--------|----------------------|
//! | item / history / user not found         | 404    | `not_found`          |
//! | insufficient stock                      | 400    | `insufficient_stock` |
//! | bad credentials                         | 400    | `bad_credentials`    |
//! | malformed JSON (body or stored)         | 400    | `malformed_json`     |
//! | validation, duplicate username          | 400    | `validation_error`   |
//! | unparsable path or query parameter      | 400    | `invalid_parameter`  |
//! | missing / invalid token                 | 401    | `unauthorized`       |
//! | non-admin delete, admin registration    | 403    | `forbidden`          |
//! | anything else                           | 500    | `internal_error`     |

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use stockroom_core::{CoreError, ValidationError};
use stockroom_db::DbError;
use tracing::{debug, error};

/// API errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Malformed JSON: {0}")]
    MalformedBody(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        ApiError::Db(DbError::Core(err))
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        CoreError::Validation(err).into()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        // Missing route params are a routing bug, not a client error
        if rejection.status().is_server_error() {
            ApiError::Internal(rejection.body_text())
        } else {
            ApiError::InvalidParameter(rejection.body_text())
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidParameter(rejection.body_text())
    }
}

impl ApiError {
    /// Status and machine-readable code for this error.
    pub fn classify(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Db(DbError::Core(core)) => match core {
                CoreError::ItemNotFound(_) | CoreError::HistoryNotFound(_) => {
                    (StatusCode::NOT_FOUND, "not_found")
                }
                CoreError::InsufficientStock { .. } => {
                    (StatusCode::BAD_REQUEST, "insufficient_stock")
                }
                CoreError::BadCredentials => (StatusCode::BAD_REQUEST, "bad_credentials"),
                CoreError::MalformedJson(_) => (StatusCode::BAD_REQUEST, "malformed_json"),
                CoreError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            },
            ApiError::Db(DbError::NotFound { .. }) => (StatusCode::NOT_FOUND, "not_found"),
            ApiError::Db(db) if db.is_client_error() => {
                (StatusCode::BAD_REQUEST, "validation_error")
            }
            ApiError::Db(_) | ApiError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "unauthorized"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            ApiError::MalformedBody(_) => (StatusCode::BAD_REQUEST, "malformed_json"),
            ApiError::InvalidParameter(_) => (StatusCode::BAD_REQUEST, "invalid_parameter"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.classify();

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            debug!(error = %self, status = %status, "Request rejected");
            self.to_string()
        };

        let mut response = (status, Json(ErrorBody { code, message })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                axum::http::header::WWW_AUTHENTICATE,
                axum::http::HeaderValue::from_static("Bearer"),
            );
        }
        response
    }
}
