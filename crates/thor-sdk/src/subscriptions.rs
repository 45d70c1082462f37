//! Native block and event subscriptions
//!
//! A [`Subscription`] owns one WebSocket connection to a topic-specific
//! node endpoint and fans every pushed message out to its listeners.
//!
//! Lifecycle: `Created -> Open -> Closed`. Listeners can be added or
//! removed at any time; a change applies from the next pushed message on
//! and missed messages are never replayed.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thor_primitives::H256;
use tokio::task::JoinHandle;
use url::Url;

use crate::types::EventCriteria;
use crate::ws::{WsConnector, WsEvent};
use crate::SdkError;

// ==================== URLs ====================

/// Turn a node base URL into the WebSocket URL for `path`
/// (`http` becomes `ws`, `https` becomes `wss`).
pub fn subscription_url(base: &str, path: &str) -> Result<Url, SdkError> {
    let mut url = Url::parse(base)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(SdkError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| SdkError::InvalidUrl(format!("cannot use scheme '{}'", scheme)))?;

    let prefix = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{}{}", prefix, path));
    url.set_query(None);
    Ok(url)
}

/// `/subscriptions/block`, optionally starting after block `pos`
pub fn block_subscription_url(base: &str, pos: Option<&H256>) -> Result<String, SdkError> {
    let mut url = subscription_url(base, "/subscriptions/block")?;
    if let Some(pos) = pos {
        url.query_pairs_mut().append_pair("pos", &pos.to_hex());
    }
    Ok(url.to_string())
}

/// `/subscriptions/event` filtered by `criteria`
pub fn event_subscription_url(
    base: &str,
    criteria: &EventCriteria,
    pos: Option<&H256>,
) -> Result<String, SdkError> {
    let mut url = subscription_url(base, "/subscriptions/event")?;
    {
        let mut query = url.query_pairs_mut();
        if let Some(address) = &criteria.address {
            query.append_pair("addr", &address.to_hex());
        }
        for (i, topic) in criteria.topics().iter().enumerate() {
            if let Some(topic) = topic {
                query.append_pair(&format!("t{}", i), &topic.to_hex());
            }
        }
        if let Some(pos) = pos {
            query.append_pair("pos", &pos.to_hex());
        }
    }
    Ok(url.to_string())
}

// ==================== Listeners ====================

/// Receives the messages and lifecycle events of one subscription.
///
/// Callbacks run on the subscription's pump task and must not block.
pub trait SubscriptionListener: Send + Sync {
    /// A pushed message, parsed once and shared by all listeners
    fn on_message(&self, message: &Value);

    /// The connection is established
    fn on_open(&self) {}

    /// Transport error or unparseable message
    fn on_error(&self, _error: &str) {}

    /// The connection is gone; no further callbacks follow
    fn on_close(&self) {}
}

/// Handle returned by [`Subscription::add_listener`]; unique across all
/// subscriptions of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(0);

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Not connected yet
    Created,
    /// Connected and receiving
    Open,
    /// Torn down; cannot be reopened
    Closed,
}

type ListenerList = Vec<(ListenerId, Arc<dyn SubscriptionListener>)>;

struct Shared {
    state: Mutex<SubscriptionState>,
    listeners: Mutex<ListenerList>,
}

impl Shared {
    /// Listener set as of now; dispatch never holds the lock
    fn snapshot(&self) -> Vec<Arc<dyn SubscriptionListener>> {
        self.listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }

    /// Move to `Closed` and notify once
    fn mark_closed(&self) {
        {
            let mut state = self.state.lock();
            if *state == SubscriptionState::Closed {
                return;
            }
            *state = SubscriptionState::Closed;
        }
        for listener in self.snapshot() {
            listener.on_close();
        }
    }

    fn dispatch(&self, event: WsEvent, url: &str) {
        match event {
            WsEvent::Open => {
                for listener in self.snapshot() {
                    listener.on_open();
                }
            }
            WsEvent::Message(text) => match serde_json::from_str::<Value>(&text) {
                Ok(message) => {
                    for listener in self.snapshot() {
                        listener.on_message(&message);
                    }
                }
                Err(e) => {
                    tracing::warn!(%url, error = %e, "discarding unparseable push message");
                    let error = format!("invalid message: {}", e);
                    for listener in self.snapshot() {
                        listener.on_error(&error);
                    }
                }
            },
            WsEvent::Error(error) => {
                for listener in self.snapshot() {
                    listener.on_error(&error);
                }
            }
            WsEvent::Close => self.mark_closed(),
        }
    }
}

/// One native subscription connection
pub struct Subscription {
    url: String,
    connector: Arc<dyn WsConnector>,
    shared: Arc<Shared>,
    // serializes `open` so a topic is connected at most once
    opening: tokio::sync::Mutex<()>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl Subscription {
    /// Subscription to `url`; nothing is connected until [`open`](Self::open)
    pub fn new(url: impl Into<String>, connector: Arc<dyn WsConnector>) -> Self {
        Self {
            url: url.into(),
            connector,
            shared: Arc::new(Shared {
                state: Mutex::new(SubscriptionState::Created),
                listeners: Mutex::new(Vec::new()),
            }),
            opening: tokio::sync::Mutex::new(()),
            pump: Mutex::new(None),
        }
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state
    pub fn state(&self) -> SubscriptionState {
        *self.shared.state.lock()
    }

    /// Attach a listener; it sees messages pushed from now on
    pub fn add_listener(&self, listener: Arc<dyn SubscriptionListener>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.lock().push((id, listener));
        id
    }

    /// Detach a listener; false if it was not attached
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Number of attached listeners
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.lock().len()
    }

    /// Connect and start delivering messages. Opening an open subscription
    /// is a no-op; a closed one cannot be reopened. Concurrent callers wait
    /// for the first connection attempt instead of connecting again.
    pub async fn open(&self) -> Result<(), SdkError> {
        let _opening = self.opening.lock().await;
        match self.state() {
            SubscriptionState::Open => return Ok(()),
            SubscriptionState::Closed => {
                return Err(SdkError::WebSocket(format!(
                    "subscription to {} is closed",
                    self.url
                )))
            }
            SubscriptionState::Created => {}
        }

        let mut events = self.connector.connect(&self.url).await?;
        {
            let mut state = self.shared.state.lock();
            if *state == SubscriptionState::Closed {
                return Err(SdkError::WebSocket(format!(
                    "subscription to {} closed while connecting",
                    self.url
                )));
            }
            *state = SubscriptionState::Open;
        }
        tracing::info!(url = %self.url, "subscription opened");

        let shared = Arc::clone(&self.shared);
        let url = self.url.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let closing = event == WsEvent::Close;
                shared.dispatch(event, &url);
                if closing {
                    break;
                }
            }
            shared.mark_closed();
            tracing::info!(%url, "subscription ended");
        });
        *self.pump.lock() = Some(handle);
        Ok(())
    }

    /// Tear down the connection. Messages still in flight are dropped.
    pub fn close(&self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
        if self.state() != SubscriptionState::Closed {
            tracing::info!(url = %self.url, "subscription closed");
        }
        self.shared.mark_closed();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.pump.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("url", &self.url)
            .field("state", &self.state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
