// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment-driven runtime configuration

use anyhow::{Context, Result};
use std::env;

/// Top-level configuration for the node, assembled once at startup.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub listen_addr: String,
    pub cors_allowed_origins: Vec<String>,
    pub provider: ProviderConfig,
    pub qdrant: QdrantConfig,
    pub object_store: ObjectStoreConfig,
    /// Question streamed to every open connection after an upload lands.
    pub broadcast_question: String,
}

/// Connection details for the OpenAI-compatible model provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_base: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub image_model: String,
    pub speech_model: String,
    pub speech_voice: String,
}

/// Connection details for the remote Qdrant instance.
#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection_name: String,
}

/// Connection details for the S3-compatible object storage portal.
///
/// When `endpoint` is absent the node falls back to an in-memory store,
/// which keeps local development working without bucket credentials.
#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub api_token: Option<String>,
    pub public_base_url: Option<String>,
}

impl NodeConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default(),
            provider: ProviderConfig::from_env()?,
            qdrant: QdrantConfig::from_env()?,
            object_store: ObjectStoreConfig::from_env(),
            broadcast_question: env::var("UPLOAD_BROADCAST_QUESTION")
                .unwrap_or_else(|_| "what is RAG".to_string()),
        })
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY").context("Missing OPENAI_API_KEY")?;

        Ok(Self {
            api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key,
            chat_model: env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            embedding_model: env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "text-embedding-ada-002".to_string()),
            image_model: env::var("IMAGE_MODEL").unwrap_or_else(|_| "dall-e-3".to_string()),
            speech_model: env::var("SPEECH_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            speech_voice: env::var("SPEECH_VOICE").unwrap_or_else(|_| "alloy".to_string()),
        })
    }
}

impl QdrantConfig {
    pub fn from_env() -> Result<Self> {
        let url = env::var("QDRANT_URL").context("Missing QDRANT_URL")?;
        let api_key = env::var("QDRANT_API_KEY").ok();

        Ok(Self {
            url,
            api_key,
            collection_name: env::var("QDRANT_COLLECTION")
                .unwrap_or_else(|_| "Websites".to_string()),
        })
    }
}

impl ObjectStoreConfig {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("STORAGE_ENDPOINT").ok(),
            bucket: env::var("STORAGE_BUCKET").unwrap_or_else(|_| "scanimage".to_string()),
            api_token: env::var("STORAGE_API_TOKEN").ok(),
            public_base_url: env::var("STORAGE_PUBLIC_URL").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_store_defaults() {
        let config = ObjectStoreConfig {
            endpoint: None,
            bucket: "scanimage".to_string(),
            api_token: None,
            public_base_url: None,
        };
        assert_eq!(config.bucket, "scanimage");
        assert!(config.endpoint.is_none());
    }
}
