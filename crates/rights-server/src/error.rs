//! API error types

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use rights_core::{ErrorKind, RightsError};

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Rights(#[from] RightsError),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rights(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Rights(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::Persistence => StatusCode::BAD_GATEWAY,
                ErrorKind::SchemaMismatch => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Rights(e) => match e.kind() {
                ErrorKind::NotFound => "not_found",
                ErrorKind::Unauthorized => "unauthorized",
                ErrorKind::Validation => "validation",
                ErrorKind::Persistence => "persistence",
                ErrorKind::SchemaMismatch => "internal",
            },
            ApiError::InvalidBody(_) => "validation",
            ApiError::Internal(_) => "internal",
        }
    }

    fn reason(&self) -> Option<&'static str> {
        match self {
            ApiError::Rights(RightsError::Persistence(e)) => Some(e.reason()),
            _ => None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("Request failed: {}", self);
        }

        let body = ErrorResponse {
            error: ErrorDetail {
                kind: self.kind(),
                reason: self.reason(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// API result type
pub type ApiResult<T> = Result<T, ApiError>;
