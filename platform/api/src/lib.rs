use std::sync::Arc;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use platform_db::DbError;
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

/// Shared handler result type.
pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,
    #[error("bad request: {0}")]
    InvalidInput(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error")]
    Internal(Arc<anyhow::Error>),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound => "NOT_FOUND",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Internal(_) => "INTERNAL",
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self::Internal(Arc::new(err))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self::internal(value)
    }
}

/// Driver messages stay in the log; clients get a fixed detail.
impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Rejected(detail) => {
                warn!(%detail, "store rejected the write");
                Self::InvalidInput("record references missing or invalid data".into())
            }
            DbError::Duplicate(detail) => {
                warn!(%detail, "store reported a duplicate");
                Self::Conflict("record already exists".into())
            }
            other => Self::internal(other.into()),
        }
    }
}

/// RFC 7807 body.
#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let ApiError::NotFound = self {
            return status.into_response();
        }
        if let ApiError::Internal(err) = &self {
            error!(error = ?err, "request failed");
        }
        let body = ProblemDetails {
            problem_type: self.code(),
            title: status.canonical_reason().unwrap_or("error"),
            // Display of Internal never includes the wrapped error.
            detail: self.to_string(),
        };
        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        response
    }
}

/// `201 Created` with a `Location` pointing at the new resource.
#[derive(Clone, Debug, PartialEq)]
pub struct Created<T> {
    pub location: String,
    pub body: T,
}

impl<T> Created<T> {
    pub fn new(location: impl Into<String>, body: T) -> Self {
        Self {
            location: location.into(),
            body,
        }
    }
}

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let location = match HeaderValue::try_from(self.location) {
            Ok(value) => value,
            Err(err) => return ApiError::internal(err.into()).into_response(),
        };
        (
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            Json(self.body),
        )
            .into_response()
    }
}
