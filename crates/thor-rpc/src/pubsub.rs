//! `eth_subscribe` emulation over native subscriptions
//!
//! Each `eth_subscribe` call gets a fresh id and one listener on every
//! native subscription its topic maps to. Native subscriptions are shared
//! by URL: two `eth_subscribe` calls with the same filter reuse one
//! connection, and the connection is closed once its last listener is
//! removed. Every native push is formatted and broadcast as an
//! `eth_subscription` frame. When the node closes a connection, every id
//! listening on it ends as if it had been unsubscribed.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use thor_sdk::subscriptions::{
    block_subscription_url, event_subscription_url, ListenerId, Subscription,
    SubscriptionListener, SubscriptionState,
};
use thor_sdk::types::{NativeBlock, NativeEventLog};
use thor_sdk::ws::WsConnector;
use tokio::sync::broadcast;

use crate::error::{RpcError, RpcResult};
use crate::filter::LogFilter;
use crate::formatter::{format_header, format_log};

/// Capacity of the notification channel
pub const NOTIFICATION_CAPACITY: usize = 1024;

/// Supported subscription topics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionKind {
    /// New block headers
    NewHeads,
    /// Event logs matching a filter
    Logs,
}

impl SubscriptionKind {
    /// Parse a topic name; anything unsupported is invalid params
    pub fn parse(name: &str) -> RpcResult<Self> {
        match name {
            "newHeads" => Ok(SubscriptionKind::NewHeads),
            "logs" => Ok(SubscriptionKind::Logs),
            other => Err(RpcError::invalid_params(format!(
                "invalid subscription type: {}",
                other
            ))),
        }
    }
}

/// Builds an `eth_subscription` notification frame
pub fn notification(subscription: &str, result: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "method": "eth_subscription",
        "params": {
            "subscription": subscription,
            "result": result,
        }
    })
}

fn random_id() -> String {
    format!("0x{}", hex::encode(rand::random::<[u8; 16]>()))
}

/// Formats native pushes for one `eth_subscribe` id
struct Forwarder {
    id: String,
    kind: SubscriptionKind,
    sender: broadcast::Sender<Value>,
    registry: Weak<Registry>,
}

impl Forwarder {
    fn format(&self, message: &Value) -> Option<Value> {
        match self.kind {
            SubscriptionKind::NewHeads => serde_json::from_value::<NativeBlock>(message.clone())
                .map(|block| format_header(&block))
                .map_err(|e| tracing::warn!(id = %self.id, error = %e, "malformed block push"))
                .ok(),
            SubscriptionKind::Logs => serde_json::from_value::<NativeEventLog>(message.clone())
                .map_err(|e| tracing::warn!(id = %self.id, error = %e, "malformed event push"))
                .ok()
                .and_then(|log| serde_json::to_value(format_log(&log)).ok()),
        }
    }
}

impl SubscriptionListener for Forwarder {
    fn on_message(&self, message: &Value) {
        if let Some(result) = self.format(message) {
            // no receivers is fine
            let _ = self.sender.send(notification(&self.id, result));
        }
    }

    fn on_error(&self, error: &str) {
        tracing::warn!(id = %self.id, %error, "subscription error");
    }

    fn on_close(&self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        if let Some(active) = registry.end(&self.id) {
            tracing::info!(id = %self.id, kind = ?active.kind, "subscription ended by node");
        }
    }
}

struct Active {
    kind: SubscriptionKind,
    listeners: Vec<(Arc<Subscription>, ListenerId)>,
}

/// Native connections by URL and the `eth_subscribe` ids using them
#[derive(Default)]
struct Registry {
    native: Mutex<HashMap<String, Arc<Subscription>>>,
    active: Mutex<HashMap<String, Active>>,
}

impl Registry {
    /// Native subscription for `url`, created when missing or closed
    fn native_for(&self, url: &str, connector: &Arc<dyn WsConnector>) -> Arc<Subscription> {
        let mut native = self.native.lock();
        if let Some(existing) = native.get(url) {
            if existing.state() != SubscriptionState::Closed {
                return Arc::clone(existing);
            }
        }
        let subscription = Arc::new(Subscription::new(url, Arc::clone(connector)));
        native.insert(url.to_string(), Arc::clone(&subscription));
        subscription
    }

    /// Forget `id` and release its listeners
    fn end(&self, id: &str) -> Option<Active> {
        let active = self.active.lock().remove(id)?;
        self.detach(&active.listeners);
        Some(active)
    }

    /// Remove listeners and close native subscriptions left without any.
    /// Only the exact subscription a listener was attached to is touched,
    /// never a newer one registered under the same URL.
    fn detach(&self, listeners: &[(Arc<Subscription>, ListenerId)]) {
        for (subscription, listener) in listeners {
            subscription.remove_listener(*listener);
            if subscription.listener_count() == 0 {
                subscription.close();
                self.forget(subscription);
            }
        }
    }

    /// Drop the map entry for `subscription` if it is still the registered one
    fn forget(&self, subscription: &Arc<Subscription>) {
        let mut native = self.native.lock();
        let current = native
            .get(subscription.url())
            .is_some_and(|registered| Arc::ptr_eq(registered, subscription));
        if current {
            native.remove(subscription.url());
        }
    }
}

/// Tracks `eth_subscribe` ids and the native subscriptions behind them
pub struct SubscriptionManager {
    ws_base: String,
    connector: Arc<dyn WsConnector>,
    registry: Arc<Registry>,
    sender: broadcast::Sender<Value>,
}

impl SubscriptionManager {
    /// Manager connecting below `ws_base` (an `http(s)` or `ws(s)` URL)
    pub fn new(ws_base: impl Into<String>, connector: Arc<dyn WsConnector>) -> Self {
        let (sender, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            ws_base: ws_base.into(),
            connector,
            registry: Arc::new(Registry::default()),
            sender,
        }
    }

    /// Receiver of every `eth_subscription` frame from now on
    pub fn notifications(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }

    /// Native endpoint URLs for a topic and its optional filter
    pub fn urls(&self, kind: SubscriptionKind, filter: Option<&Value>) -> RpcResult<Vec<String>> {
        match kind {
            SubscriptionKind::NewHeads => Ok(vec![block_subscription_url(&self.ws_base, None)?]),
            SubscriptionKind::Logs => {
                let filter = match filter {
                    Some(value) => LogFilter::from_value(value)?,
                    None => LogFilter::default(),
                };
                filter
                    .criteria_set()
                    .iter()
                    .map(|criteria| {
                        event_subscription_url(&self.ws_base, criteria, None).map_err(RpcError::from)
                    })
                    .collect()
            }
        }
    }

    /// Start a subscription and return its id. Unsupported topics fail
    /// before any connection is attempted.
    pub async fn subscribe(&self, kind: &str, filter: Option<&Value>) -> RpcResult<String> {
        let kind = SubscriptionKind::parse(kind)?;
        let urls = self.urls(kind, filter)?;
        let id = random_id();

        let forwarder: Arc<dyn SubscriptionListener> = Arc::new(Forwarder {
            id: id.clone(),
            kind,
            sender: self.sender.clone(),
            registry: Arc::downgrade(&self.registry),
        });

        let mut listeners = Vec::with_capacity(urls.len());
        for url in urls {
            let subscription = self.registry.native_for(&url, &self.connector);
            let listener = subscription.add_listener(Arc::clone(&forwarder));
            listeners.push((Arc::clone(&subscription), listener));

            if let Err(e) = subscription.open().await {
                tracing::warn!(%url, error = %e, "failed to open native subscription");
                self.registry.detach(&listeners);
                return Err(e.into());
            }
        }

        // a connection that ended before the id was registered never reports it
        let mut active = self.registry.active.lock();
        if listeners
            .iter()
            .any(|(subscription, _)| subscription.state() == SubscriptionState::Closed)
        {
            drop(active);
            self.registry.detach(&listeners);
            return Err(RpcError::provider("subscription closed by node"));
        }
        tracing::info!(%id, ?kind, connections = listeners.len(), "subscription started");
        active.insert(id.clone(), Active { kind, listeners });
        Ok(id)
    }

    /// Stop a subscription; false if the id is unknown
    pub fn unsubscribe(&self, id: &str) -> bool {
        let Some(active) = self.registry.end(id) else {
            return false;
        };
        tracing::info!(%id, kind = ?active.kind, "subscription stopped");
        true
    }

    /// Ids of running subscriptions
    pub fn active_ids(&self) -> Vec<String> {
        self.registry.active.lock().keys().cloned().collect()
    }

    /// Number of native connections held
    pub fn connection_count(&self) -> usize {
        self.registry.native.lock().len()
    }

    /// Stop everything
    pub fn close_all(&self) {
        let ids = self.active_ids();
        for id in ids {
            self.unsubscribe(&id);
        }
    }
}

impl std::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("ws_base", &self.ws_base)
            .field("active", &self.registry.active.lock().len())
            .field("connections", &self.connection_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use thor_primitives::{Address, H256};
    use thor_sdk::ws::{MockWsConnector, WsEvent};

    const BASE: &str = "http://localhost:8669";

    fn manager() -> (MockWsConnector, SubscriptionManager) {
        let connector = MockWsConnector::new();
        let manager = SubscriptionManager::new(BASE, Arc::new(connector.clone()));
        (connector, manager)
    }

    fn block_push(number: u32) -> Value {
        json!({
            "number": number,
            "id": H256::from_low_u64_be(u64::from(number)),
            "parentID": H256::ZERO,
            "timestamp": 1000,
            "gasLimit": 10000000,
            "beneficiary": Address::ZERO,
            "transactions": [],
            "obsolete": false
        })
    }

    async fn next_frame(rx: &mut broadcast::Receiver<Value>) -> Value {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed")
    }

    async fn wait_for(condition: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition never held");
    }

    fn released(manager: &SubscriptionManager) -> bool {
        manager.active_ids().is_empty() && manager.connection_count() == 0
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!(SubscriptionKind::parse("newHeads").unwrap(), SubscriptionKind::NewHeads);
        assert_eq!(SubscriptionKind::parse("logs").unwrap(), SubscriptionKind::Logs);
        assert!(matches!(
            SubscriptionKind::parse("newPendingTransactions"),
            Err(RpcError::InvalidParams(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_type_never_connects() {
        let (connector, manager) = manager();
        let err = manager.subscribe("syncing", None).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)));
        assert!(connector.connected().is_empty());
    }

    #[tokio::test]
    async fn test_new_heads_frames() {
        let (connector, manager) = manager();
        let mut rx = manager.notifications();
        let id = manager.subscribe("newHeads", None).await.unwrap();
        assert!(id.starts_with("0x"));

        let url = "ws://localhost:8669/subscriptions/block";
        assert!(connector.push_json(url, &block_push(7)));

        let frame = next_frame(&mut rx).await;
        assert_eq!(frame["method"], "eth_subscription");
        assert_eq!(frame["params"]["subscription"], id.as_str());
        assert_eq!(frame["params"]["result"]["number"], "0x7");
        assert!(frame["params"]["result"].get("transactions").is_none());
    }

    #[tokio::test]
    async fn test_same_topic_shares_connection() {
        let (connector, manager) = manager();
        let a = manager.subscribe("newHeads", None).await.unwrap();
        let b = manager.subscribe("newHeads", None).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(manager.connection_count(), 1);
        assert_eq!(connector.connected().len(), 1);

        assert!(manager.unsubscribe(&a));
        assert_eq!(manager.connection_count(), 1);
        assert!(manager.unsubscribe(&b));
        assert_eq!(manager.connection_count(), 0);
        assert!(!manager.unsubscribe(&b));
    }

    #[tokio::test]
    async fn test_log_filter_alternatives_open_one_connection_each() {
        let (connector, manager) = manager();
        let filter = json!({
            "address": [Address::from_bytes([1; 20]).to_hex(), Address::from_bytes([2; 20]).to_hex()],
        });
        manager.subscribe("logs", Some(&filter)).await.unwrap();
        assert_eq!(connector.connected().len(), 2);
        assert!(connector
            .connected()
            .iter()
            .all(|url| url.starts_with("ws://localhost:8669/subscriptions/event?addr=")));
    }

    #[tokio::test]
    async fn test_failed_open_is_provider_error() {
        let (connector, manager) = manager();
        connector.fail("ws://localhost:8669/subscriptions/block", "refused");
        let err = manager.subscribe("newHeads", None).await.unwrap_err();
        assert!(matches!(err, RpcError::Provider { .. }));
        assert!(manager.active_ids().is_empty());
        assert_eq!(manager.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_push_is_skipped() {
        let (connector, manager) = manager();
        let mut rx = manager.notifications();
        manager.subscribe("newHeads", None).await.unwrap();
        let url = "ws://localhost:8669/subscriptions/block";
        connector.push(url, WsEvent::Message("{\"number\":\"not a number\"}".into()));
        connector.push_json(url, &block_push(8));
        let frame = next_frame(&mut rx).await;
        assert_eq!(frame["params"]["result"]["number"], "0x8");
    }

    #[tokio::test]
    async fn test_remote_close_ends_subscription() {
        let (connector, manager) = manager();
        let id = manager.subscribe("newHeads", None).await.unwrap();
        connector.push("ws://localhost:8669/subscriptions/block", WsEvent::Close);

        wait_for(|| released(&manager)).await;
        assert!(!manager.unsubscribe(&id));
    }

    #[tokio::test]
    async fn test_remote_close_of_one_log_connection_releases_the_others() {
        let (connector, manager) = manager();
        let first = Address::from_bytes([1; 20]);
        let filter = json!({ "address": [first.to_hex(), Address::from_bytes([2; 20]).to_hex()] });
        let id = manager.subscribe("logs", Some(&filter)).await.unwrap();
        assert_eq!(manager.connection_count(), 2);

        let urls = connector.connected();
        connector.push(&urls[0], WsEvent::Close);

        wait_for(|| released(&manager)).await;
        wait_for(|| !connector.is_live(&urls[1])).await;
        assert!(!manager.unsubscribe(&id));
    }

    #[tokio::test]
    async fn test_stale_id_does_not_detach_resubscribed_listener() {
        let (connector, manager) = manager();
        let url = "ws://localhost:8669/subscriptions/block";
        let mut rx = manager.notifications();

        let old = manager.subscribe("newHeads", None).await.unwrap();
        connector.push(url, WsEvent::Close);
        wait_for(|| released(&manager)).await;

        let new = manager.subscribe("newHeads", None).await.unwrap();
        assert_eq!(connector.connected().len(), 2);
        assert!(!manager.unsubscribe(&old));
        assert_eq!(manager.connection_count(), 1);

        assert!(connector.push_json(url, &block_push(9)));
        let frame = next_frame(&mut rx).await;
        assert_eq!(frame["params"]["subscription"], new.as_str());
        assert_eq!(frame["params"]["result"]["number"], "0x9");
    }
}
