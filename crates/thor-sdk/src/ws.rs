//! WebSocket transport for node subscriptions
//!
//! A connector turns a URL into a stream of [`WsEvent`]s. The stream opens
//! with [`WsEvent::Open`] once the handshake completes and ends after
//! [`WsEvent::Close`]; nothing is sent over the socket after that.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::SdkError;

/// One event from a WebSocket connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsEvent {
    /// Handshake completed
    Open,
    /// Text frame
    Message(String),
    /// Transport error; the connection may still be open
    Error(String),
    /// Connection closed by either side
    Close,
}

/// Opens WebSocket connections (object-safe)
#[async_trait]
pub trait WsConnector: Send + Sync {
    /// Connect to `url`. Dropping the receiver closes the connection.
    async fn connect(&self, url: &str) -> Result<mpsc::UnboundedReceiver<WsEvent>, SdkError>;
}

// ==================== tungstenite ====================

/// tokio-tungstenite backed connector
#[cfg(feature = "ws")]
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

#[cfg(feature = "ws")]
#[async_trait]
impl WsConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<mpsc::UnboundedReceiver<WsEvent>, SdkError> {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::{connect_async, tungstenite::Message};

        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| SdkError::WebSocket(e.to_string()))?;
        tracing::debug!(%url, "websocket connected");

        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(WsEvent::Open);
        let url = url.to_string();

        tokio::spawn(async move {
            let (mut write, mut read) = stream.split();
            loop {
                tokio::select! {
                    _ = tx.closed() => {
                        let _ = write.send(Message::Close(None)).await;
                        break;
                    }
                    frame = read.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if tx.send(WsEvent::Message(text.as_str().to_owned())).is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(payload))) => {
                            let _ = write.send(Message::Pong(payload)).await;
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(%url, error = %e, "websocket read failed");
                            let _ = tx.send(WsEvent::Error(e.to_string()));
                            break;
                        }
                    }
                }
            }
            let _ = tx.send(WsEvent::Close);
            tracing::debug!(%url, "websocket closed");
        });

        Ok(rx)
    }
}

// ==================== Mock ====================

/// In-memory connector for tests. Each successful `connect` hands out a
/// fresh channel; tests push events into the latest channel for a URL.
#[derive(Clone, Default)]
pub struct MockWsConnector {
    senders: Arc<Mutex<HashMap<String, mpsc::UnboundedSender<WsEvent>>>>,
    connected: Arc<Mutex<Vec<String>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
}

impl MockWsConnector {
    /// Connector with no connections
    pub fn new() -> Self {
        Self::default()
    }

    /// Make connections to `url` fail with `message`
    pub fn fail(&self, url: &str, message: &str) {
        self.failures
            .lock()
            .insert(url.to_string(), message.to_string());
    }

    /// Deliver `event` on the connection to `url`; false if none is live
    pub fn push(&self, url: &str, event: WsEvent) -> bool {
        match self.senders.lock().get(url) {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    /// Deliver a JSON text frame
    pub fn push_json(&self, url: &str, value: &serde_json::Value) -> bool {
        self.push(url, WsEvent::Message(value.to_string()))
    }

    /// Every URL connected to, in order
    pub fn connected(&self) -> Vec<String> {
        self.connected.lock().clone()
    }

    /// Whether the consumer of the connection to `url` is still listening
    pub fn is_live(&self, url: &str) -> bool {
        self.senders
            .lock()
            .get(url)
            .map(|tx| !tx.is_closed())
            .unwrap_or(false)
    }
}

#[async_trait]
impl WsConnector for MockWsConnector {
    async fn connect(&self, url: &str) -> Result<mpsc::UnboundedReceiver<WsEvent>, SdkError> {
        if let Some(message) = self.failures.lock().get(url) {
            return Err(SdkError::WebSocket(message.clone()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(WsEvent::Open);
        self.senders.lock().insert(url.to_string(), tx);
        self.connected.lock().push(url.to_string());
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connect_and_push() {
        let ws = MockWsConnector::new();
        let mut rx = ws.connect("ws://node/subscriptions/block").await.unwrap();
        assert_eq!(rx.recv().await, Some(WsEvent::Open));

        assert!(ws.push("ws://node/subscriptions/block", WsEvent::Message("{}".into())));
        assert_eq!(rx.recv().await, Some(WsEvent::Message("{}".into())));
        assert!(!ws.push("ws://other", WsEvent::Close));
        assert_eq!(ws.connected(), vec!["ws://node/subscriptions/block".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_failure_and_liveness() {
        let ws = MockWsConnector::new();
        ws.fail("ws://down", "refused");
        assert!(matches!(
            ws.connect("ws://down").await,
            Err(SdkError::WebSocket(m)) if m == "refused"
        ));

        let rx = ws.connect("ws://up").await.unwrap();
        assert!(ws.is_live("ws://up"));
        drop(rx);
        assert!(!ws.is_live("ws://up"));
    }
}
