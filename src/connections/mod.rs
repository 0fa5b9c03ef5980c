// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Connection registry and broadcast

use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::RetrievalEvent;

/// Tracks the outbound channel of every live client connection.
///
/// All mutation goes through register/unregister/broadcast; the map
/// itself is never exposed, so there is no iterate-while-mutate window.
#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    connections: Arc<RwLock<HashMap<Uuid, mpsc::UnboundedSender<RetrievalEvent>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, id: Uuid, sender: mpsc::UnboundedSender<RetrievalEvent>) {
        let mut connections = self.connections.write().await;
        info!("Registering connection: {}", id);
        connections.insert(id, sender);
    }

    /// Remove a connection. Removing an absent id is a no-op.
    pub async fn unregister(&self, id: Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(&id).is_some() {
            info!("Removed connection: {}", id);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Consume one event stream and fan each event out to every
    /// registered connection.
    ///
    /// The producer runs once no matter how many subscribers there are.
    /// Connections whose channel has closed are collected during the
    /// pass and removed only after it completes.
    pub async fn broadcast<S>(&self, mut events: S) -> usize
    where
        S: Stream<Item = RetrievalEvent> + Unpin,
    {
        let targets: Vec<(Uuid, mpsc::UnboundedSender<RetrievalEvent>)> = {
            let connections = self.connections.read().await;
            connections
                .iter()
                .map(|(id, sender)| (*id, sender.clone()))
                .collect()
        };

        if targets.is_empty() {
            return 0;
        }

        let mut disconnected: Vec<Uuid> = Vec::new();
        let mut delivered = 0usize;

        while let Some(event) = events.next().await {
            for (id, sender) in &targets {
                if disconnected.contains(id) {
                    continue;
                }
                if sender.send(event.clone()).is_err() {
                    debug!("Send to connection {} failed, scheduling removal", id);
                    disconnected.push(*id);
                } else {
                    delivered += 1;
                }
            }
        }

        if !disconnected.is_empty() {
            let mut connections = self.connections.write().await;
            for id in &disconnected {
                connections.remove(id);
            }
            info!("Dropped {} dead connections after broadcast", disconnected.len());
        }

        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::wrappers::ReceiverStream;

    fn event_stream(events: Vec<RetrievalEvent>) -> ReceiverStream<RetrievalEvent> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            for event in events {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        ReceiverStream::new(rx)
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let registry = ConnectionRegistry::new();
        registry.unregister(Uuid::new_v4()).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_connections() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();
        registry.register(Uuid::new_v4(), tx_a).await;
        registry.register(Uuid::new_v4(), tx_b).await;

        let delivered = registry
            .broadcast(event_stream(vec![RetrievalEvent::Done]))
            .await;

        assert_eq!(delivered, 2);
        assert_eq!(rx_a.recv().await, Some(RetrievalEvent::Done));
        assert_eq!(rx_b.recv().await, Some(RetrievalEvent::Done));
    }

    #[tokio::test]
    async fn test_broadcast_removes_dead_connections_after_pass() {
        let registry = ConnectionRegistry::new();
        let (tx_dead, rx_dead) = mpsc::unbounded_channel();
        let (tx_live, mut rx_live) = mpsc::unbounded_channel();
        drop(rx_dead);
        registry.register(Uuid::new_v4(), tx_dead).await;
        registry.register(Uuid::new_v4(), tx_live).await;

        registry
            .broadcast(event_stream(vec![
                RetrievalEvent::OnChatModelStream("a".to_string()),
                RetrievalEvent::Done,
            ]))
            .await;

        assert_eq!(registry.connection_count().await, 1);
        assert_eq!(
            rx_live.recv().await,
            Some(RetrievalEvent::OnChatModelStream("a".to_string()))
        );
    }

    #[tokio::test]
    async fn test_broadcast_without_connections_delivers_nothing() {
        let registry = ConnectionRegistry::new();
        let delivered = registry
            .broadcast(event_stream(vec![RetrievalEvent::Done]))
            .await;
        assert_eq!(delivered, 0);
    }
}
