// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object storage gateway

mod http;

pub use http::HttpObjectStore;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::ObjectStoreConfig;
use crate::error::IndexError;

/// Uploads byte streams to a remote bucket and hands back a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, data: Bytes, content_type: &str)
        -> Result<String, IndexError>;
}

/// In-memory backend used in tests and credential-less local runs.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, (Bytes, String)>>>,
    injected_error: Arc<Mutex<Option<IndexError>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next upload with the given error.
    pub async fn inject_error(&self, error: IndexError) {
        let mut injected = self.injected_error.lock().await;
        *injected = Some(error);
    }

    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }

    pub async fn get(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().await.get(key).map(|(data, _)| data.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, IndexError> {
        let mut injected = self.injected_error.lock().await;
        if let Some(error) = injected.take() {
            return Err(error);
        }
        drop(injected);

        let mut objects = self.objects.lock().await;
        objects.insert(key.to_string(), (data, content_type.to_string()));

        Ok(format!("memory://{}", key))
    }
}

/// Build the object store backend the configuration calls for, falling
/// back to the in-memory store when no endpoint is configured.
pub fn from_config(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>, IndexError> {
    match &config.endpoint {
        Some(_) => Ok(Arc::new(HttpObjectStore::new(config.clone())?)),
        None => {
            warn!("STORAGE_ENDPOINT not set, falling back to in-memory object store");
            Ok(Arc::new(MemoryObjectStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_returns_url_and_stores_bytes() {
        let store = MemoryObjectStore::new();
        let url = store
            .put("images/a.png", Bytes::from_static(&[1, 2, 3]), "image/png")
            .await
            .unwrap();

        assert_eq!(url, "memory://images/a.png");
        assert_eq!(
            store.get("images/a.png").await,
            Some(Bytes::from_static(&[1, 2, 3]))
        );
    }

    #[tokio::test]
    async fn test_injected_error_fails_one_upload() {
        let store = MemoryObjectStore::new();
        store
            .inject_error(IndexError::Provider("bucket down".to_string()))
            .await;

        assert!(store.put("k", Bytes::new(), "image/png").await.is_err());
        assert!(store.put("k", Bytes::new(), "image/png").await.is_ok());
    }
}
