use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Upload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("User already exists")]
    Conflict,

    #[error("Invalid credentials")]
    Authentication,

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Attach the generic message shown to the caller when this error
    /// escapes a handler.
    pub fn context(self, message: &'static str) -> ApiError {
        ApiError {
            message,
            source: self,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Synthesis(_) => StatusCode::BAD_GATEWAY,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::Persistence(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Synthesis(_) => "SYNTHESIS_ERROR",
            AppError::Conflict => "CONFLICT",
            AppError::Authentication => "AUTHENTICATION_ERROR",
            AppError::Persistence(_) => "PERSISTENCE_ERROR",
            AppError::Io(_) => "IO_ERROR",
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(format!("migration failed: {}", e))
    }
}

/// An [`AppError`] paired with the message the caller is allowed to see.
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    source: AppError,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.source.status();
        let code = self.source.code();

        if status.is_server_error() {
            tracing::error!("{}: {} - {}", self.message, code, self.source);
        } else {
            tracing::warn!("{}: {} - {}", self.message, code, self.source);
        }

        let message = match self.source {
            AppError::Conflict | AppError::Authentication => self.source.to_string(),
            _ => self.message.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}
