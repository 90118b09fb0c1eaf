use super::AppState;
use crate::document::{parse_document, TranslationRequest};
use crate::error::JsonTranslatorError;
use crate::languages::{self, Language};
use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderName, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tracing::{error, info, warn};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn reject_error(err: JsonTranslatorError) -> ApiError {
    if err.is_client_error() {
        reject(StatusCode::BAD_REQUEST, err.to_string())
    } else {
        error!("Request failed: {}", err);
        reject(StatusCode::INTERNAL_SERVER_ERROR, format!("Server error: {}", err))
    }
}

/// An upload cut off by the body limit is reported like any other oversized file.
fn reject_multipart(err: MultipartError, headers: &HeaderMap, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        let size = headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(limit + 1);
        warn!("Rejected upload: body exceeds {} bytes", limit);
        return reject_error(JsonTranslatorError::FileTooLarge { size, limit });
    }
    reject(err.status(), err.body_text())
}

fn not_found() -> ApiError {
    reject(StatusCode::NOT_FOUND, "File not found or expired")
}

/// POST /translate: validate the upload, then stream progress as SSE.
pub async fn translate_upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let limit = state.max_upload_bytes;
    let mut file: Option<Bytes> = None;
    let mut language_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| reject_multipart(e, &headers, limit))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let has_file_name = field.file_name().is_some_and(|n| !n.is_empty());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| reject_multipart(e, &headers, limit))?;
                if has_file_name || !bytes.is_empty() {
                    file = Some(bytes);
                }
            }
            "language" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| reject_multipart(e, &headers, limit))?;
                language_name = Some(text.trim().to_string());
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| reject_error(JsonTranslatorError::MissingFile))?;
    let language = Language::from_name(language_name.as_deref().unwrap_or_default())
        .map_err(reject_error)?;
    let document = parse_document(&file, state.max_upload_bytes).map_err(|e| {
        warn!("Rejected upload: {}", e);
        reject_error(e)
    })?;

    info!(
        "Accepted upload: {} entries, {} bytes, target {}",
        document.len(),
        file.len(),
        language
    );

    let request = TranslationRequest::new(document, language);
    let events = state
        .pipeline
        .clone()
        .stream(request)
        .map(|event| Ok::<Event, Infallible>(Event::default().data(event.to_json())));

    Ok((
        [
            (header::CACHE_CONTROL, "no-cache"),
            (HeaderName::from_static("x-accel-buffering"), "no"),
        ],
        Sse::new(events).keep_alive(KeepAlive::default()),
    )
        .into_response())
}

/// GET /download/{file_id}: hand out the artifact once.
pub async fn download(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Response, ApiError> {
    let artifact = state
        .store
        .get(&file_id)
        .await
        .map_err(reject_error)?
        .filter(|artifact| !artifact.consumed)
        .ok_or_else(not_found)?;

    // A concurrent download that flipped the flag first wins.
    if !state
        .store
        .mark_consumed(&file_id)
        .await
        .map_err(reject_error)?
    {
        return Err(not_found());
    }

    let body = artifact.to_pretty_json().map_err(reject_error)?;
    info!("Download of {} ({} bytes)", file_id, body.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", artifact.file_name()),
            ),
        ],
        body,
    )
        .into_response())
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let cached_files = state.store.len().await.unwrap_or_else(|e| {
        warn!("Health check could not read store: {}", e);
        0
    });

    Json(json!({
        "status": "ok",
        "languages": languages::count(),
        "cached_files": cached_files,
        "total_translations": state.counter.get().await,
    }))
}

/// GET /languages
pub async fn list_languages() -> Json<Vec<&'static str>> {
    Json(languages::names())
}
