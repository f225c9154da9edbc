use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid short code '{0}': must be 1-32 alphanumeric characters and not a reserved path")]
    InvalidCode(String),

    #[error("Short code '{0}' is already in use")]
    CodeConflict(String),

    #[error("URL not found")]
    NotFound(String),

    #[error("URL expired")]
    Expired(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl LinkError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            LinkError::MissingUrl | LinkError::InvalidUrl(_) | LinkError::InvalidCode(_) => {
                StatusCode::BAD_REQUEST
            }
            LinkError::CodeConflict(_) => StatusCode::CONFLICT,
            LinkError::NotFound(_) => StatusCode::NOT_FOUND,
            LinkError::Expired(_) => StatusCode::GONE,
            LinkError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            LinkError::Configuration(_) | LinkError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LinkError::MissingUrl => "missing_url",
            LinkError::InvalidUrl(_) => "invalid_url",
            LinkError::InvalidCode(_) => "invalid_code",
            LinkError::CodeConflict(_) => "code_conflict",
            LinkError::NotFound(_) => "not_found",
            LinkError::Expired(_) => "expired",
            LinkError::Validation(_) => "validation_error",
            LinkError::Configuration(_) => "configuration_error",
            LinkError::Internal(_) => "internal_error",
        }
    }
}

impl From<validator::ValidationErrors> for LinkError {
    fn from(err: validator::ValidationErrors) -> Self {
        LinkError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for LinkError {
    fn from(rejection: JsonRejection) -> Self {
        LinkError::Validation(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub code: u16,
}

impl ErrorResponse {
    pub fn new(error: &str, message: &str, code: u16) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
            code,
        }
    }

    pub fn from_link_error(err: &LinkError) -> Self {
        Self::new(err.kind(), &err.to_string(), err.status_code().as_u16())
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            // Redirect misses are answered in plain text, like the redirect itself.
            LinkError::NotFound(_) | LinkError::Expired(_) => {
                (status, self.to_string()).into_response()
            }
            LinkError::Internal(ref msg) => {
                tracing::error!(error = %msg, "Internal error while handling request");
                (status, Json(ErrorResponse::from_link_error(&self))).into_response()
            }
            _ => (status, Json(ErrorResponse::from_link_error(&self))).into_response(),
        }
    }
}
