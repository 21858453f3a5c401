use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{
    AudioHistoryEntry, ConvertResponse, ConvertTextRequest, HealthResponse, LoginRequest,
    MessageResponse, RegisterRequest,
};
use crate::api::routes::AppState;
use crate::error::{ApiError, AppError};
use crate::pipeline::ConversionInput;

const UPLOAD_FIELD: &str = "file";

pub async fn convert_text(
    State(state): State<Arc<AppState>>,
    request: Result<Json<ConvertTextRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    const FAILED: &str = "Text conversion failed";

    let Json(request) = request.map_err(|e| bad_json(e).context(FAILED))?;
    let reference = state
        .pipeline
        .convert(ConversionInput::Text(request.text))
        .await
        .map_err(|e| e.context(FAILED))?;

    Ok(Json(ConvertResponse {
        message: "Text converted to audio successfully",
        audio_path: reference.audio_path(),
    }))
}

pub async fn convert_pdf(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    const FAILED: &str = "PDF conversion failed";

    let upload = read_upload(multipart).await.map_err(|e| e.context(FAILED))?;
    let reference = state
        .pipeline
        .convert(ConversionInput::Pdf(upload))
        .await
        .map_err(|e| e.context(FAILED))?;

    Ok(Json(ConvertResponse {
        message: "PDF converted to audio successfully",
        audio_path: reference.audio_path(),
    }))
}

pub async fn convert_image(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>, ApiError> {
    const FAILED: &str = "Image conversion failed";

    let upload = read_upload(multipart).await.map_err(|e| e.context(FAILED))?;
    let reference = state
        .pipeline
        .convert(ConversionInput::Image(upload))
        .await
        .map_err(|e| e.context(FAILED))?;

    Ok(Json(ConvertResponse {
        message: "Image converted to audio successfully",
        audio_path: reference.audio_path(),
    }))
}

pub async fn audio_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AudioHistoryEntry>>, ApiError> {
    let records = state
        .records
        .list_all()
        .await
        .map_err(|e| e.context("Error retrieving audio history"))?;

    Ok(Json(
        records
            .into_iter()
            .map(|r| AudioHistoryEntry {
                id: r.id,
                filename: r.filename,
            })
            .collect(),
    ))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    request: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    const FAILED: &str = "Registration failed";

    let Json(request) = request.map_err(|e| bad_json(e).context(FAILED))?;
    state
        .credentials
        .register(&request.username, &request.email, &request.password)
        .await
        .map_err(|e| e.context(FAILED))?;

    Ok(Json(MessageResponse {
        message: "Registration successful",
    }))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    const FAILED: &str = "Login failed";

    let Json(request) = request.map_err(|e| bad_json(e).context(FAILED))?;
    state
        .credentials
        .login(&request.email, &request.password)
        .await
        .map_err(|e| e.context(FAILED))?;

    Ok(Json(MessageResponse {
        message: "Login successful",
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn bad_json(rejection: JsonRejection) -> AppError {
    AppError::InvalidRequest(rejection.body_text())
}

/// Bytes of the `file` part, or `None` if the form has no such part.
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Option<Vec<u8>>, AppError> {
    let mut multipart = multipart.map_err(|e| AppError::InvalidRequest(e.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, "Malformed multipart body"))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error(e, "Failed to read upload"))?;
        return Ok(Some(data.to_vec()));
    }

    Ok(None)
}

/// The body limit trips while the form is streamed, so it shows up here
/// rather than as a rejection.
fn multipart_error(e: MultipartError, what: &str) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidRequest(format!("{}: {}", what, e))
    }
}
