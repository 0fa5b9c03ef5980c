// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversational retrieval flow
//!
//! Given a question: embed it, pull the nearest chunks out of the vector
//! store, then stream a completion conditioned on them. Consumers see
//! the whole thing as one ordered event sequence.

pub mod session;

pub use session::{ChatTurn, SessionStore, SessionStoreConfig};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::error::IndexError;
use crate::providers::LanguageModel;
use crate::vector::{DocumentChunk, VectorStore};

/// Number of nearest chunks retrieved per question.
const TOP_K: u64 = 4;

/// One event in a streamed retrieval.
///
/// Every stream is finite and ends with exactly one `Done` or `Error`,
/// never both. Serialized as `{"event_type": ..., "content": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event_type", content = "content", rename_all = "snake_case")]
pub enum RetrievalEvent {
    OnRetrieverEnd(Vec<DocumentChunk>),
    OnChatModelStream(String),
    Done,
    Error(String),
}

/// Response of the synchronous chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    pub question: String,
    pub answer: String,
    pub documents: Vec<DocumentChunk>,
}

/// Runs the retrieval flow against the configured model and store.
pub struct ChatEngine {
    model: Arc<dyn LanguageModel>,
    store: Arc<dyn VectorStore>,
    sessions: SessionStore,
}

impl ChatEngine {
    pub fn new(model: Arc<dyn LanguageModel>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            model,
            store,
            sessions: SessionStore::new(SessionStoreConfig::default()),
        }
    }

    /// Stream the answer to a question as an ordered event sequence:
    /// one `OnRetrieverEnd`, the tokens in generation order, one terminal
    /// `Done` or `Error`.
    pub fn stream_answer(&self, question: String) -> ReceiverStream<RetrievalEvent> {
        let model = Arc::clone(&self.model);
        let store = Arc::clone(&self.store);
        let (tx, rx) = mpsc::channel(32);

        tokio::spawn(async move {
            let documents = match retrieve(model.as_ref(), store.as_ref(), &question).await {
                Ok(documents) => documents,
                Err(e) => {
                    warn!("Retrieval failed: {}", e);
                    let _ = tx.send(RetrievalEvent::Error(e.to_string())).await;
                    return;
                }
            };

            if tx
                .send(RetrievalEvent::OnRetrieverEnd(documents.clone()))
                .await
                .is_err()
            {
                return;
            }

            let prompt = build_prompt(&documents, &question, &[]);
            let mut fragments = match model.stream_complete(&prompt).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!("Streaming completion failed to open: {}", e);
                    let _ = tx.send(RetrievalEvent::Error(e.to_string())).await;
                    return;
                }
            };

            while let Some(fragment) = fragments.recv().await {
                match fragment {
                    Ok(token) => {
                        if tx
                            .send(RetrievalEvent::OnChatModelStream(token))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    Err(e) => {
                        // Tokens already delivered stay delivered; the
                        // stream still terminates with a single event.
                        warn!("Streaming completion failed mid-stream: {}", e);
                        let _ = tx.send(RetrievalEvent::Error(e.to_string())).await;
                        return;
                    }
                }
            }

            let _ = tx.send(RetrievalEvent::Done).await;
        });

        ReceiverStream::new(rx)
    }

    /// Synchronous variant: retrieve, complete once, return the answer
    /// with the retrieved documents. Prior turns of the session, if one
    /// is named, are folded into the prompt and the exchange recorded.
    pub async fn answer(
        &self,
        question: &str,
        session_id: Option<&str>,
    ) -> Result<ChatAnswer, IndexError> {
        let documents = retrieve(self.model.as_ref(), self.store.as_ref(), question).await?;

        let history = match session_id {
            Some(id) => self.sessions.history(id).await,
            None => Vec::new(),
        };

        let prompt = build_prompt(&documents, question, &history);
        let answer = self.model.complete(&prompt).await?;

        if let Some(id) = session_id {
            self.sessions
                .record(
                    id,
                    ChatTurn {
                        question: question.to_string(),
                        answer: answer.clone(),
                    },
                )
                .await;
        }

        Ok(ChatAnswer {
            question: question.to_string(),
            answer,
            documents,
        })
    }
}

async fn retrieve(
    model: &dyn LanguageModel,
    store: &dyn VectorStore,
    question: &str,
) -> Result<Vec<DocumentChunk>, IndexError> {
    let vector = model
        .embed(question)
        .await
        .map_err(|e| IndexError::Retrieval(e.to_string()))?;

    let documents = store
        .search(vector, TOP_K)
        .await
        .map_err(|e| IndexError::Retrieval(e.to_string()))?;

    debug!("Retrieved {} documents for question", documents.len());
    Ok(documents)
}

fn build_prompt(documents: &[DocumentChunk], question: &str, history: &[ChatTurn]) -> String {
    let context = documents
        .iter()
        .map(|d| d.page_content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::new();
    if !history.is_empty() {
        prompt.push_str("Previous conversation:\n");
        for turn in history {
            prompt.push_str(&format!("Q: {}\nA: {}\n", turn.question, turn.answer));
        }
        prompt.push('\n');
    }

    prompt.push_str(&format!(
        "\nAnswer the question based on the context, in a concise manner, in markdown and using bullet points where applicable.\n\nContext: {}\nQuestion: {}\nAnswer:\n",
        context, question
    ));

    prompt
}
