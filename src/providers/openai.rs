// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! OpenAI-compatible REST client

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::LanguageModel;
use crate::config::ProviderConfig;
use crate::error::IndexError;

const EXTRACT_PROMPT: &str = "Extract all text from this image. Return only the extracted text, preserving the original layout as much as possible. If no text is found, respond with an empty string.";

// --- serde structs for the provider wire format ---

#[derive(serde::Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(serde::Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(serde::Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    stream: bool,
}

#[derive(serde::Serialize)]
struct ChatMessage {
    role: &'static str,
    content: serde_json::Value,
}

#[derive(serde::Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(serde::Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(serde::Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(serde::Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(serde::Deserialize)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(serde::Deserialize, Default)]
struct ChatStreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(serde::Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u32,
    size: &'a str,
    response_format: &'a str,
}

#[derive(serde::Deserialize)]
struct ImageResponse {
    data: Vec<ImageData>,
}

#[derive(serde::Deserialize)]
struct ImageData {
    b64_json: String,
}

#[derive(serde::Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
}

/// Client for the configured OpenAI-compatible provider.
pub struct OpenAiClient {
    client: Client,
    config: ProviderConfig,
}

impl OpenAiClient {
    pub fn new(config: ProviderConfig) -> Result<Self, IndexError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(IndexError::provider)?;

        info!(
            "Model provider configured: base={}, chat={}, embeddings={}",
            config.api_base, config.chat_model, config.embedding_model
        );

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post_json<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<reqwest::Response, IndexError> {
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IndexError::Provider(format!(
                "{} returned {}: {}",
                path, status, body
            )));
        }

        Ok(response)
    }

    fn chat_body<'a>(&'a self, content: serde_json::Value, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "system",
                content,
            }],
            temperature: 0.0,
            stream,
        }
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IndexError> {
        let request = EmbeddingRequest {
            model: &self.config.embedding_model,
            input: text,
        };

        let response: EmbeddingResponse =
            self.post_json("embeddings", &request).await?.json().await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| IndexError::Provider("embeddings response was empty".to_string()))
    }

    async fn complete(&self, prompt: &str) -> Result<String, IndexError> {
        let request = self.chat_body(serde_json::Value::String(prompt.to_string()), false);

        let response: ChatResponse = self
            .post_json("chat/completions", &request)
            .await?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| IndexError::Provider("completion response had no content".to_string()))
    }

    async fn stream_complete(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, IndexError>>, IndexError> {
        let request = self.chat_body(serde_json::Value::String(prompt.to_string()), true);
        let response = self.post_json("chat/completions", &request).await?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = String::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx.send(Err(IndexError::provider(e))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // SSE frames are newline-delimited `data: {...}` lines.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim().to_string();
                    buffer.drain(..=pos);

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    if data == "[DONE]" {
                        return;
                    }

                    match serde_json::from_str::<ChatStreamChunk>(data) {
                        Ok(parsed) => {
                            let content = parsed
                                .choices
                                .into_iter()
                                .next()
                                .and_then(|c| c.delta.content)
                                .unwrap_or_default();
                            if !content.is_empty() && tx.send(Ok(content)).await.is_err() {
                                return;
                            }
                        }
                        Err(e) => {
                            debug!("Skipping unparseable stream frame: {}", e);
                        }
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn extract_text(&self, image_data_url: &str) -> Result<String, IndexError> {
        let content = serde_json::json!([
            {"type": "text", "text": EXTRACT_PROMPT},
            {"type": "image_url", "image_url": {"url": image_data_url}}
        ]);
        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![ChatMessage {
                role: "user",
                content,
            }],
            temperature: 0.0,
            stream: false,
        };

        let response: ChatResponse = self
            .post_json("chat/completions", &request)
            .await?
            .json()
            .await?;

        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        info!("Vision extraction complete: {} chars", text.len());
        Ok(text)
    }

    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>, IndexError> {
        use base64::{engine::general_purpose::STANDARD, Engine as _};

        let request = ImageRequest {
            model: &self.config.image_model,
            prompt,
            n: 1,
            size: "1024x1024",
            response_format: "b64_json",
        };

        let response: ImageResponse = self
            .post_json("images/generations", &request)
            .await?
            .json()
            .await?;

        let encoded = response
            .data
            .into_iter()
            .next()
            .map(|d| d.b64_json)
            .ok_or_else(|| IndexError::Provider("image response was empty".to_string()))?;

        STANDARD.decode(encoded).map_err(IndexError::provider)
    }

    async fn synthesize_speech(&self, text: &str) -> Result<Vec<u8>, IndexError> {
        let request = SpeechRequest {
            model: &self.config.speech_model,
            input: text,
            voice: &self.config.speech_voice,
        };

        let response = self.post_json("audio/speech", &request).await?;
        let bytes = response.bytes().await.map_err(|e| {
            warn!("Speech synthesis body read failed: {}", e);
            IndexError::provider(e)
        })?;

        Ok(bytes.to_vec())
    }
}
