// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Scripted in-process model backend for tests and offline runs

use async_trait::async_trait;
use std::io::Cursor;
use tokio::sync::mpsc;

use super::LanguageModel;
use crate::error::IndexError;

/// Which provider operation a [`ScriptedModel`] should fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedFailure {
    None,
    Embedding,
    Completion,
    MidStream,
    Extraction,
    ImageGeneration,
    Speech,
}

/// Deterministic [`LanguageModel`] backend.
///
/// Streams the configured fragments in order; `complete` returns them
/// joined. A single failure point can be injected to exercise the
/// degraded paths without a network.
pub struct ScriptedModel {
    embedding: Vec<f32>,
    fragments: Vec<String>,
    extracted_text: String,
    failure: ScriptedFailure,
}

impl Default for ScriptedModel {
    fn default() -> Self {
        Self {
            embedding: vec![1.0, 0.0, 0.0, 0.0],
            fragments: vec!["Hello".to_string(), " world".to_string()],
            extracted_text: "scripted page text".to_string(),
            failure: ScriptedFailure::None,
        }
    }
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    pub fn with_fragments(mut self, fragments: Vec<&str>) -> Self {
        self.fragments = fragments.into_iter().map(String::from).collect();
        self
    }

    pub fn with_extracted_text(mut self, text: &str) -> Self {
        self.extracted_text = text.to_string();
        self
    }

    pub fn failing(mut self, failure: ScriptedFailure) -> Self {
        self.failure = failure;
        self
    }

    fn fail_if(&self, failure: ScriptedFailure, what: &str) -> Result<(), IndexError> {
        if self.failure == failure {
            Err(IndexError::Provider(format!("scripted {} failure", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, IndexError> {
        self.fail_if(ScriptedFailure::Embedding, "embedding")?;
        Ok(self.embedding.clone())
    }

    async fn complete(&self, _prompt: &str) -> Result<String, IndexError> {
        self.fail_if(ScriptedFailure::Completion, "completion")?;
        Ok(self.fragments.concat())
    }

    async fn stream_complete(
        &self,
        _prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, IndexError>>, IndexError> {
        self.fail_if(ScriptedFailure::Completion, "completion")?;

        let fragments = self.fragments.clone();
        let fail_mid_stream = self.failure == ScriptedFailure::MidStream;
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            for (i, fragment) in fragments.into_iter().enumerate() {
                if fail_mid_stream && i == 1 {
                    let _ = tx
                        .send(Err(IndexError::Provider(
                            "scripted mid-stream failure".to_string(),
                        )))
                        .await;
                    return;
                }
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
        });

        Ok(rx)
    }

    async fn extract_text(&self, _image_data_url: &str) -> Result<String, IndexError> {
        self.fail_if(ScriptedFailure::Extraction, "extraction")?;
        Ok(self.extracted_text.clone())
    }

    async fn generate_image(&self, _prompt: &str) -> Result<Vec<u8>, IndexError> {
        self.fail_if(ScriptedFailure::ImageGeneration, "image generation")?;

        // A real, decodable PNG so downstream re-encoding has data to chew on.
        let img = image::DynamicImage::new_rgb8(4, 4);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(IndexError::provider)?;
        Ok(bytes)
    }

    async fn synthesize_speech(&self, _text: &str) -> Result<Vec<u8>, IndexError> {
        self.fail_if(ScriptedFailure::Speech, "speech")?;
        Ok(vec![0u8; 16])
    }
}
