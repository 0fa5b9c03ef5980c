// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Request handlers for the HTTP endpoints

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::errors::{ApiFailure, ErrorBody};
use super::server::AppState;
use crate::chat::ChatAnswer;
use crate::error::IndexError;

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_url: String,
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /chat - answer a question over the indexed content
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, ApiFailure> {
    let answer = state
        .chat
        .answer(&request.message, request.session_id.as_deref())
        .await?;

    Ok(Json(answer))
}

/// POST /indexingURL - index a webpage
pub async fn indexing_url_handler(
    State(state): State<AppState>,
    Json(request): Json<Message>,
) -> impl IntoResponse {
    match state.ingestor.ingest_url(&request.message).await {
        Ok(response) => (StatusCode::OK, Json(json!({ "response": response }))),
        Err(e) => {
            warn!("URL ingestion failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// POST /indexingDoc - index an uploaded pdf or txt file
pub async fn indexing_doc_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> impl IntoResponse {
    let (filename, _, data) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        }
    };

    match state.ingestor.ingest_file(&filename, &data).await {
        Ok(response) => (StatusCode::OK, Json(json!({ "response": response }))),
        Err(e) => {
            warn!("Document ingestion failed for {}: {}", filename, e);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}

/// POST /uploadS3 - store a binary file and notify open connections
pub async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let (filename, content_type, data) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    };

    let key = format!(
        "uploads/{}/{}",
        chrono::Utc::now().format("%Y%m%d"),
        filename
    );
    let file_url = match state.object_store.put(&key, data, &content_type).await {
        Ok(url) => url,
        Err(e) => return ApiFailure(e).into_response(),
    };
    info!("Stored upload {} at {}", filename, file_url);

    // Every open connection gets one shared event stream; the flow runs
    // once regardless of subscriber count.
    if state.registry.connection_count().await > 0 {
        let events = state.chat.stream_answer(state.broadcast_question.clone());
        let delivered = state.registry.broadcast(events).await;
        info!("Broadcast after upload delivered {} events", delivered);
    }

    Json(UploadResponse { file_url }).into_response()
}

/// POST /processImage - run the study-aid pipeline over an image
///
/// Always returns 200 with whichever fields the pipeline managed to
/// produce.
pub async fn process_image_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Response {
    let (_, _, data) = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody::new(e.to_string())),
            )
                .into_response()
        }
    };

    let aid = state.pipeline.run(&data).await;
    Json(aid).into_response()
}

/// Pull the first file field out of a multipart body.
async fn read_upload(mut multipart: Multipart) -> Result<(String, String, Bytes), IndexError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(IndexError::provider)?
    {
        let Some(filename) = field.file_name().map(String::from) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(IndexError::provider)?;

        return Ok((filename, content_type, data));
    }

    Err(IndexError::Provider("no file in request".to_string()))
}
