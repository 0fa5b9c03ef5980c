// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Document ingestion: load, split, embed, upsert

pub mod loader;
pub mod splitter;

pub use splitter::Splitter;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::IndexError;
use crate::providers::LanguageModel;
use crate::vector::{DocumentChunk, EmbeddedChunk, VectorStore};

/// Loads documents, splits them into chunks and forwards the chunks to
/// the vector store.
pub struct Ingestor {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn VectorStore>,
    http: reqwest::Client,
    collection_name: String,
}

impl Ingestor {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn VectorStore>,
        collection_name: String,
    ) -> Result<Self, IndexError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(IndexError::provider)?;

        Ok(Self {
            model,
            store,
            http,
            collection_name,
        })
    }

    /// Fetch a web page, split it 1000/20 and index every chunk tagged
    /// with the source URL.
    pub async fn ingest_url(&self, url: &str) -> Result<String, IndexError> {
        let text = loader::load_webpage(&self.http, url).await?;
        if text.trim().is_empty() {
            return Err(IndexError::EmptyDocument);
        }

        let chunks: Vec<DocumentChunk> = Splitter::for_webpages()
            .split(&text)
            .into_iter()
            .map(|content| DocumentChunk::new(content, url))
            .collect();

        let count = self.index_chunks(chunks).await?;
        info!("Indexed {} chunks from {}", count, url);

        Ok(format!(
            "Successfully uploaded {} documents to collection {} from URL.",
            count, self.collection_name
        ))
    }

    /// Persist an uploaded file to a scoped temp file, extract its text
    /// and index it split 200/20. The temp copy is removed on every exit
    /// path when the guard drops.
    pub async fn ingest_file(&self, filename: &str, data: &[u8]) -> Result<String, IndexError> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();

        if extension != "txt" && extension != "pdf" {
            return Err(IndexError::UnsupportedType(extension));
        }

        let mut temp = tempfile::Builder::new()
            .suffix(&format!(".{}", extension))
            .tempfile()
            .map_err(IndexError::provider)?;
        temp.write_all(data).map_err(IndexError::provider)?;
        temp.flush().map_err(IndexError::provider)?;

        let text = match extension.as_str() {
            "txt" => loader::load_text(temp.path())?,
            _ => loader::load_pdf(temp.path())?,
        };

        if text.trim().is_empty() {
            return Err(IndexError::EmptyDocument);
        }

        let chunks: Vec<DocumentChunk> = Splitter::for_files()
            .split(&text)
            .into_iter()
            .map(|content| DocumentChunk::new(content, filename))
            .collect();

        let count = self.index_chunks(chunks).await?;
        info!("Indexed {} chunks from {}", count, filename);

        Ok(format!(
            "Successfully uploaded {} documents from {}.",
            count, filename
        ))
    }

    async fn index_chunks(&self, chunks: Vec<DocumentChunk>) -> Result<usize, IndexError> {
        self.store.ensure_collection().await?;

        let mut embedded = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            let vector = self.model.embed(&chunk.page_content).await.map_err(|e| {
                warn!("Embedding failed for chunk from {}: {}", chunk.source, e);
                e
            })?;
            embedded.push(EmbeddedChunk { chunk, vector });
        }

        let count = embedded.len();
        self.store.add_documents(embedded).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ScriptedModel;
    use crate::vector::MemoryVectorStore;

    fn ingestor_with(store: Arc<MemoryVectorStore>) -> Ingestor {
        Ingestor::new(
            Arc::new(ScriptedModel::new()),
            store,
            "Websites".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ingest_txt_file() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor_with(store.clone());

        let text = "word ".repeat(100);
        let message = ingestor
            .ingest_file("notes.txt", text.as_bytes())
            .await
            .unwrap();

        assert!(message.starts_with("Successfully uploaded 3 documents"));
        assert_eq!(store.point_count().await, 3);
    }

    #[tokio::test]
    async fn test_ingest_file_tags_source_filename() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor_with(store.clone());

        ingestor
            .ingest_file("notes.txt", b"a short note")
            .await
            .unwrap();

        let results = store.search(vec![1.0, 0.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(results[0].source, "notes.txt");
    }

    #[tokio::test]
    async fn test_unsupported_extension_writes_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor_with(store.clone());

        let err = ingestor.ingest_file("image.docx", b"data").await.unwrap_err();
        assert!(matches!(err, IndexError::UnsupportedType(ext) if ext == "docx"));
        assert_eq!(store.point_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_file_writes_nothing() {
        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = ingestor_with(store.clone());

        let err = ingestor.ingest_file("empty.txt", b"   \n").await.unwrap_err();
        assert!(matches!(err, IndexError::EmptyDocument));
        assert_eq!(store.point_count().await, 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_writes_nothing() {
        use crate::providers::ScriptedFailure;

        let store = Arc::new(MemoryVectorStore::new());
        let ingestor = Ingestor::new(
            Arc::new(ScriptedModel::new().failing(ScriptedFailure::Embedding)),
            store.clone(),
            "Websites".to_string(),
        )
        .unwrap();

        let err = ingestor.ingest_file("notes.txt", b"some text").await.unwrap_err();
        assert!(matches!(err, IndexError::Provider(_)));
        assert_eq!(store.point_count().await, 0);
    }
}
