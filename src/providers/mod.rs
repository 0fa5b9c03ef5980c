// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Language-model provider gateway
//!
//! Everything the node cannot do itself — embeddings, completions, vision
//! extraction, illustration, speech — is delegated to an OpenAI-compatible
//! API behind the [`LanguageModel`] trait.

mod openai;
mod scripted;

pub use openai::OpenAiClient;
pub use scripted::{ScriptedFailure, ScriptedModel};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::IndexError;

/// Gateway to the external model provider.
///
/// Streaming completions hand back an mpsc receiver; fragments arrive in
/// generation order and a mid-stream failure is delivered in-band as an
/// `Err` item before the channel closes.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Compute the embedding vector for a piece of text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError>;

    /// Run a chat completion and return the full answer.
    async fn complete(&self, prompt: &str) -> Result<String, IndexError>;

    /// Open a streaming chat completion.
    async fn stream_complete(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, IndexError>>, IndexError>;

    /// Extract the text visible in an image, given as a data URL.
    async fn extract_text(&self, image_data_url: &str) -> Result<String, IndexError>;

    /// Generate an illustration for a prompt, returning encoded image bytes.
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, IndexError>;

    /// Synthesize narrated audio for a piece of text.
    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, IndexError>;
}
