// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::auth::{password::PasswordError, JwtError};
use crate::config;
use crate::database::manager::DatabaseError;
use crate::services::{IdentityError, ImageHostError};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),
    ValidationError {
        message: String,
        field_errors: Option<HashMap<String, String>>,
    },
    InvalidJson(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error; `detail` is only shown in development
    InternalServerError {
        message: String,
        detail: Option<String>,
    },

    // 502 Bad Gateway (external service issues)
    BadGateway {
        message: String,
        detail: Option<String>,
    },

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::ValidationError { .. } => 400,
            ApiError::InvalidJson(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::InternalServerError { .. } => 500,
            ApiError::BadGateway { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidJson(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError { message, .. } => message,
            ApiError::BadGateway { message, .. } => message,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            ApiError::InternalServerError { detail, .. } | ApiError::BadGateway { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// Error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidJson(_) => "INVALID_JSON",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
            ApiError::BadGateway { .. } => "BAD_GATEWAY",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// JSON response body; raw detail is attached only when `expose_detail`.
    pub fn to_json(&self, expose_detail: bool) -> Value {
        let mut response = json!({
            "success": false,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            response["errors"] = json!(field_errors);
        }

        if expose_detail {
            if let Some(detail) = self.detail() {
                response["error"] = json!(detail);
            }
        }

        response
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn validation_error(message: impl Into<String>, field_errors: Option<HashMap<String, String>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn invalid_json(message: impl Into<String>) -> Self {
        ApiError::InvalidJson(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn bad_gateway(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::BadGateway {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }

    /// 500 that keeps the underlying error for development responses.
    pub fn internal(message: impl Into<String>, detail: impl ToString) -> Self {
        ApiError::InternalServerError {
            message: message.into(),
            detail: Some(detail.to_string()),
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::InvalidInput(msg) => {
                tracing::warn!("Rejected input: {}", msg);
                ApiError::bad_request(format!("Invalid input: {}", msg))
            }
            DatabaseError::ConstraintViolation(msg) => {
                tracing::warn!("Constraint violation: {}", msg);
                ApiError::bad_request(msg)
            }
            DatabaseError::UniqueViolation { constraint } => {
                if constraint.contains("email") {
                    ApiError::bad_request("User already exists with this email")
                } else if constraint.contains("mobile") {
                    ApiError::bad_request("User already exists with this mobile number")
                } else {
                    ApiError::bad_request(format!("Duplicate value violates '{}'", constraint))
                }
            }
            DatabaseError::InvalidDatabaseUrl => {
                tracing::error!("Database URL is invalid");
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::MigrationError(msg) => {
                tracing::error!("Migration error: {}", msg);
                ApiError::service_unavailable("Service is being updated, please try again later")
            }
            DatabaseError::Sqlx(
                sqlx_err @ (sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)),
            ) => {
                tracing::error!("Database unavailable: {}", sqlx_err);
                ApiError::service_unavailable("Database temporarily unavailable")
            }
            DatabaseError::Sqlx(sqlx_err) => {
                // Log the real error but return generic message
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal("Internal server error", sqlx_err)
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        tracing::error!("Password handling failed: {}", err);
        ApiError::internal("Internal server error", err)
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::InvalidToken(_) => ApiError::unauthorized("Invalid or expired token"),
            JwtError::InvalidSecret | JwtError::TokenGeneration(_) => {
                tracing::error!("Token issuance failed: {}", err);
                ApiError::internal("Internal server error", err)
            }
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        tracing::warn!("Federated identity rejected: {}", err);
        ApiError::unauthorized("Invalid authentication token")
    }
}

impl From<ImageHostError> for ApiError {
    fn from(err: ImageHostError) -> Self {
        match err {
            ImageHostError::NotConfigured => ApiError::service_unavailable("Image uploads are not available"),
            other => {
                tracing::error!("Image host error: {}", other);
                ApiError::bad_gateway("Error uploading image", other)
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.to_json(config::config().is_development());
        (status, Json(body)).into_response()
    }
}
