// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process vector store backend for tests

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::{DocumentChunk, EmbeddedChunk, VectorStore};
use crate::error::IndexError;

/// Brute-force cosine search over an in-memory point list.
#[derive(Default)]
pub struct MemoryVectorStore {
    points: Arc<Mutex<Vec<EmbeddedChunk>>>,
    injected_error: Arc<Mutex<Option<IndexError>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next store operation with the given error.
    pub async fn inject_error(&self, error: IndexError) {
        let mut injected = self.injected_error.lock().await;
        *injected = Some(error);
    }

    pub async fn point_count(&self) -> usize {
        self.points.lock().await.len()
    }

    async fn check_injected_error(&self) -> Result<(), IndexError> {
        let mut injected = self.injected_error.lock().await;
        if let Some(error) = injected.take() {
            return Err(error);
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn ensure_collection(&self) -> Result<(), IndexError> {
        self.check_injected_error().await
    }

    async fn add_documents(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), IndexError> {
        self.check_injected_error().await?;
        let mut points = self.points.lock().await;
        points.extend(chunks);
        Ok(())
    }

    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<DocumentChunk>, IndexError> {
        self.check_injected_error().await?;

        let points = self.points.lock().await;
        let mut scored: Vec<(f32, DocumentChunk)> = points
            .iter()
            .map(|p| (cosine_similarity(&p.vector, &vector), p.chunk.clone()))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(_, chunk)| chunk)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedded(content: &str, vector: Vec<f32>) -> EmbeddedChunk {
        EmbeddedChunk {
            chunk: DocumentChunk::new(content, "test"),
            vector,
        }
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = MemoryVectorStore::new();
        store
            .add_documents(vec![
                embedded("far", vec![0.0, 1.0]),
                embedded("near", vec![1.0, 0.1]),
            ])
            .await
            .unwrap();

        let results = store.search(vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].page_content, "near");
        assert_eq!(results[1].page_content, "far");
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let store = MemoryVectorStore::new();
        store
            .add_documents(vec![
                embedded("a", vec![1.0, 0.0]),
                embedded("b", vec![0.9, 0.1]),
                embedded("c", vec![0.8, 0.2]),
            ])
            .await
            .unwrap();

        let results = store.search(vec![1.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_injected_error_fails_once() {
        let store = MemoryVectorStore::new();
        store
            .inject_error(IndexError::Provider("down".to_string()))
            .await;

        assert!(store.ensure_collection().await.is_err());
        assert!(store.ensure_collection().await.is_ok());
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
