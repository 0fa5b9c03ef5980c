// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Study-aid pipeline: image → extracted text → explanation →
//! illustration → narration
//!
//! Four chained provider calls, each optional on the failure of the
//! previous. The pipeline never aborts: a failed stage leaves its field
//! empty, skips everything downstream of it, and the partial result is
//! still returned.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::IndexError;
use crate::providers::LanguageModel;
use crate::storage::ObjectStore;

/// Illustrations wider than this get scaled down before upload.
const MAX_ILLUSTRATION_WIDTH: u32 = 1024;

const EXPLAIN_PROMPT: &str = "Explain the following text in a short, simple way a young reader can follow. Two or three sentences at most.\n\nText: ";

/// Partial result of one pipeline run. Fields are populated in stage
/// order; a `None` means that stage (or one before it) failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudyAid {
    pub extracted_text: Option<String>,
    pub explanation: Option<String>,
    pub illustration_url: Option<String>,
    pub audio_url: Option<String>,
}

pub struct StudyAidPipeline {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn ObjectStore>,
}

impl StudyAidPipeline {
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn ObjectStore>) -> Self {
        Self { model, store }
    }

    /// Run all four stages over an uploaded image.
    pub async fn run(&self, image_data: &[u8]) -> StudyAid {
        let mut aid = StudyAid::default();

        // Stage 1: pull the text out of the image.
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(image_data));
        let extracted = match self.model.extract_text(&data_url).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!("Extraction produced no text, skipping remaining stages");
                return aid;
            }
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                return aid;
            }
        };
        aid.extracted_text = Some(extracted.clone());

        // Stage 2: simplify it.
        let explanation = match self
            .model
            .complete(&format!("{}{}", EXPLAIN_PROMPT, extracted))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!("Explanation failed: {}", e);
                return aid;
            }
        };
        aid.explanation = Some(explanation.clone());

        // Stage 3: illustrate the explanation.
        match self.illustrate(&explanation).await {
            Ok(url) => aid.illustration_url = Some(url),
            Err(e) => {
                warn!("Illustration failed: {}", e);
                return aid;
            }
        }

        // Stage 4: narrate it.
        match self.narrate(&explanation).await {
            Ok(url) => aid.audio_url = Some(url),
            Err(e) => {
                warn!("Narration failed: {}", e);
                return aid;
            }
        }

        info!("Study aid complete: all stages succeeded");
        aid
    }

    async fn illustrate(&self, explanation: &str) -> Result<String, IndexError> {
        let raw = self.model.generate_image(explanation).await?;
        let resized = resize_illustration(&raw)?;

        let key = format!("illustrations/{}.png", Uuid::new_v4());
        self.store.put(&key, Bytes::from(resized), "image/png").await
    }

    async fn narrate(&self, explanation: &str) -> Result<String, IndexError> {
        let audio = self.model.synthesize_speech(explanation).await?;

        let key = format!("narrations/{}.mp3", Uuid::new_v4());
        self.store.put(&key, Bytes::from(audio), "audio/mpeg").await
    }
}

/// Decode generated image bytes, bound the width and re-encode as PNG.
fn resize_illustration(data: &[u8]) -> Result<Vec<u8>, IndexError> {
    let img = image::load_from_memory(data).map_err(IndexError::provider)?;

    let img = if img.width() > MAX_ILLUSTRATION_WIDTH {
        img.resize(
            MAX_ILLUSTRATION_WIDTH,
            u32::MAX,
            image::imageops::FilterType::Lanczos3,
        )
    } else {
        img
    };

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(IndexError::provider)?;

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{ScriptedFailure, ScriptedModel};
    use crate::storage::MemoryObjectStore;

    fn pipeline_with(
        model: ScriptedModel,
        store: Arc<MemoryObjectStore>,
    ) -> StudyAidPipeline {
        StudyAidPipeline::new(Arc::new(model), store)
    }

    #[tokio::test]
    async fn test_all_stages_succeed() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(ScriptedModel::new(), store.clone());

        let aid = pipeline.run(&[1, 2, 3]).await;

        assert_eq!(aid.extracted_text.as_deref(), Some("scripted page text"));
        assert!(aid.explanation.is_some());
        assert!(aid.illustration_url.is_some());
        assert!(aid.audio_url.is_some());
        assert_eq!(store.object_count().await, 2);
    }

    #[tokio::test]
    async fn test_extraction_failure_skips_everything() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(
            ScriptedModel::new().failing(ScriptedFailure::Extraction),
            store.clone(),
        );

        let aid = pipeline.run(&[1, 2, 3]).await;

        assert!(aid.extracted_text.is_none());
        assert!(aid.explanation.is_none());
        assert!(aid.illustration_url.is_none());
        assert!(aid.audio_url.is_none());
        assert_eq!(store.object_count().await, 0);
    }

    #[tokio::test]
    async fn test_empty_extraction_counts_as_failure() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(
            ScriptedModel::new().with_extracted_text("   "),
            store.clone(),
        );

        let aid = pipeline.run(&[1, 2, 3]).await;
        assert!(aid.extracted_text.is_none());
        assert!(aid.explanation.is_none());
    }

    #[tokio::test]
    async fn test_illustration_failure_keeps_text_and_skips_audio() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(
            ScriptedModel::new().failing(ScriptedFailure::ImageGeneration),
            store.clone(),
        );

        let aid = pipeline.run(&[1, 2, 3]).await;

        assert!(aid.extracted_text.is_some());
        assert!(aid.explanation.is_some());
        assert!(aid.illustration_url.is_none());
        assert!(aid.audio_url.is_none());
    }

    #[tokio::test]
    async fn test_upload_failure_degrades_like_stage_failure() {
        let store = Arc::new(MemoryObjectStore::new());
        store
            .inject_error(IndexError::Provider("bucket down".to_string()))
            .await;
        let pipeline = pipeline_with(ScriptedModel::new(), store.clone());

        let aid = pipeline.run(&[1, 2, 3]).await;

        assert!(aid.explanation.is_some());
        assert!(aid.illustration_url.is_none());
        assert!(aid.audio_url.is_none());
    }

    #[tokio::test]
    async fn test_speech_failure_keeps_illustration() {
        let store = Arc::new(MemoryObjectStore::new());
        let pipeline = pipeline_with(
            ScriptedModel::new().failing(ScriptedFailure::Speech),
            store.clone(),
        );

        let aid = pipeline.run(&[1, 2, 3]).await;

        assert!(aid.illustration_url.is_some());
        assert!(aid.audio_url.is_none());
    }

    #[test]
    fn test_resize_bounds_width() {
        let wide = image::DynamicImage::new_rgb8(2048, 512);
        let mut bytes = Vec::new();
        wide.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let resized = resize_illustration(&bytes).unwrap();
        let reloaded = image::load_from_memory(&resized).unwrap();
        assert_eq!(reloaded.width(), MAX_ILLUSTRATION_WIDTH);
    }
}
