// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Qdrant-backed vector store

use async_trait::async_trait;
use qdrant_client::qdrant::{
    with_payload_selector, CreateCollectionBuilder, Distance, PointStruct, SearchPoints,
    UpsertPointsBuilder, Value, VectorParams, WithPayloadSelector,
};
use qdrant_client::Qdrant;
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::{DocumentChunk, EmbeddedChunk, VectorStore, EMBEDDING_DIM};
use crate::config::QdrantConfig;
use crate::error::IndexError;

pub struct QdrantStore {
    client: Qdrant,
    collection_name: String,
}

impl QdrantStore {
    pub fn new(config: QdrantConfig) -> Result<Self, IndexError> {
        let builder = Qdrant::from_url(&config.url);
        let builder = if let Some(api_key) = config.api_key {
            builder.api_key(api_key)
        } else {
            builder
        };

        let client = builder.build().map_err(IndexError::provider)?;
        info!("Qdrant client configured: collection={}", config.collection_name);

        Ok(Self {
            client,
            collection_name: config.collection_name,
        })
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn ensure_collection(&self) -> Result<(), IndexError> {
        let exists = self
            .client
            .collection_exists(&self.collection_name)
            .await
            .map_err(IndexError::provider)?;

        if exists {
            debug!("Collection {} already exists", self.collection_name);
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(self.collection_name.clone())
            .vectors_config(VectorParams {
                size: EMBEDDING_DIM,
                distance: Distance::Cosine.into(),
                ..Default::default()
            });

        self.client
            .create_collection(create_collection)
            .await
            .map_err(IndexError::provider)?;

        info!("Collection {} created successfully", self.collection_name);
        Ok(())
    }

    async fn add_documents(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), IndexError> {
        let points = chunks
            .into_iter()
            .map(|embedded| {
                let payload: HashMap<String, Value> = serde_json::from_value(json!({
                    "page_content": embedded.chunk.page_content,
                    "source": embedded.chunk.source,
                }))
                .map_err(IndexError::provider)?;

                Ok(PointStruct::new(
                    Uuid::new_v4().to_string(),
                    embedded.vector,
                    payload,
                ))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;

        let upsert_request =
            UpsertPointsBuilder::new(self.collection_name.clone(), points).build();

        self.client
            .upsert_points(upsert_request)
            .await
            .map_err(IndexError::provider)?;

        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<DocumentChunk>, IndexError> {
        let search_request = SearchPoints {
            collection_name: self.collection_name.clone(),
            vector,
            limit,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let search_response = self
            .client
            .search_points(search_request)
            .await
            .map_err(IndexError::provider)?;

        let chunks = search_response
            .result
            .into_iter()
            .filter_map(|scored_point| {
                let payload = scored_point.payload;
                let page_content = payload.get("page_content")?.as_str()?.to_string();
                let source = payload
                    .get("source")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                Some(DocumentChunk {
                    page_content,
                    source,
                })
            })
            .collect();

        Ok(chunks)
    }
}
