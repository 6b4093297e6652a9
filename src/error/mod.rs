use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::notification::DispatchError;
use crate::store::StoreError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn masked(detail: String, generic: &str) -> String {
    if is_production() {
        generic.to_string()
    } else {
        detail
    }
}

impl AppError {
    /// Status and code for the response. Each dispatch failure kind maps to
    /// a distinct status so callers can tell input errors, infrastructure
    /// errors and partial failures apart.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            AppError::Dispatch(DispatchError::Rendering(TemplateError::UnknownType(_))) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_NOTIFICATION_TYPE")
            }
            AppError::Dispatch(DispatchError::Rendering(TemplateError::Missing { .. })) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "TEMPLATE_MISSING")
            }
            AppError::Dispatch(DispatchError::Persistence(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "PERSISTENCE_FAILED")
            }
            AppError::Dispatch(DispatchError::Delivery(_)) => {
                (StatusCode::BAD_GATEWAY, "DELIVERY_FAILED")
            }
            AppError::Store(StoreError::NotFound(_)) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let log_message = self.to_string();

        // Client-facing messages for server-side faults are masked in
        // production; validation and auth detail is safe to return.
        let client_message = if status.is_server_error() {
            masked(log_message.clone(), "Internal server error")
        } else {
            log_message.clone()
        };

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %log_message,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
