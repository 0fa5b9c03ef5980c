// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Router assembly and server startup

use anyhow::Result;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::{handlers, ws};
use crate::chat::ChatEngine;
use crate::config::NodeConfig;
use crate::connections::ConnectionRegistry;
use crate::ingest::Ingestor;
use crate::pipeline::StudyAidPipeline;
use crate::providers::OpenAiClient;
use crate::storage::ObjectStore;
use crate::vector::QdrantStore;

#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatEngine>,
    pub ingestor: Arc<Ingestor>,
    pub registry: ConnectionRegistry,
    pub object_store: Arc<dyn ObjectStore>,
    pub pipeline: Arc<StudyAidPipeline>,
    pub broadcast_question: String,
}

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = if origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/async_chat", get(ws::async_chat_handler))
        .route("/chat", post(handlers::chat_handler))
        .route("/indexingURL", post(handlers::indexing_url_handler))
        .route("/indexingDoc", post(handlers::indexing_doc_handler))
        .route("/uploadS3", post(handlers::upload_handler))
        .route("/processImage", post(handlers::process_image_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire every component from the configuration and serve until shutdown.
pub async fn start_server(config: NodeConfig) -> Result<()> {
    let model = Arc::new(OpenAiClient::new(config.provider.clone())?);
    let store = Arc::new(QdrantStore::new(config.qdrant.clone())?);
    let object_store = crate::storage::from_config(&config.object_store)?;

    let state = AppState {
        chat: Arc::new(ChatEngine::new(model.clone(), store.clone())),
        ingestor: Arc::new(Ingestor::new(
            model.clone(),
            store.clone(),
            config.qdrant.collection_name.clone(),
        )?),
        registry: ConnectionRegistry::new(),
        object_store: object_store.clone(),
        pipeline: Arc::new(StudyAidPipeline::new(model, object_store)),
        broadcast_question: config.broadcast_question.clone(),
    };

    let app = build_router(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!("API server listening on {}", config.listen_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
