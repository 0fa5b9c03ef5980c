// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP backend for S3-compatible storage portals

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use tracing::info;

use super::ObjectStore;
use crate::config::ObjectStoreConfig;
use crate::error::IndexError;

/// Uploads objects with a bearer-authenticated PUT and derives the
/// public URL from the configured base.
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    api_token: Option<String>,
    public_base_url: String,
}

impl HttpObjectStore {
    pub fn new(config: ObjectStoreConfig) -> Result<Self, IndexError> {
        let endpoint = config
            .endpoint
            .ok_or_else(|| IndexError::Provider("storage endpoint not configured".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let public_base_url = config
            .public_base_url
            .unwrap_or_else(|| format!("{}/{}", endpoint, config.bucket))
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(IndexError::provider)?;

        info!(
            "Object store configured: endpoint={}, bucket={}",
            endpoint, config.bucket
        );

        Ok(Self {
            client,
            endpoint,
            bucket: config.bucket,
            api_token: config.api_token,
            public_base_url,
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, IndexError> {
        let url = format!("{}/{}/{}", self.endpoint, self.bucket, key);

        let mut request = self
            .client
            .put(&url)
            .header("Content-Type", content_type)
            .body(data);

        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::Provider(format!(
                "upload of {} returned {}",
                key, status
            )));
        }

        Ok(format!("{}/{}", self.public_base_url, key))
    }
}
