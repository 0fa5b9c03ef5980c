// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vector store gateway
//!
//! The node never indexes vectors itself; everything goes to a remote
//! store behind the [`VectorStore`] trait. [`QdrantStore`] talks to a
//! Qdrant instance, [`MemoryVectorStore`] is the in-process backend used
//! in tests.

mod memory;
mod qdrant;

pub use memory::MemoryVectorStore;
pub use qdrant::QdrantStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IndexError;

/// Embedding dimension of the ada-002 class of models.
pub const EMBEDDING_DIM: u64 = 1536;

/// One indexed unit: a fixed-size substring of a source document plus
/// where it came from. Immutable once created; owned by the store after
/// upload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentChunk {
    pub page_content: String,
    pub source: String,
}

impl DocumentChunk {
    pub fn new(page_content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            source: source.into(),
        }
    }
}

/// A chunk paired with its embedding, ready for upsert.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: DocumentChunk,
    pub vector: Vec<f32>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Create the collection iff it does not exist. Idempotent.
    async fn ensure_collection(&self) -> Result<(), IndexError>;

    /// Upsert one point per chunk.
    async fn add_documents(&self, chunks: Vec<EmbeddedChunk>) -> Result<(), IndexError>;

    /// Top-`limit` nearest chunks by cosine similarity, best first.
    async fn search(&self, vector: Vec<f32>, limit: u64) -> Result<Vec<DocumentChunk>, IndexError>;
}
