//! Node transport: one JSON request against a REST path

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{EventLogQuery, LogOrder, NativeEventLog, RangeUnit};
use crate::SdkError;

/// HTTP verb used by the node API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST with a JSON body
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Node transport (object-safe). Timeouts and retries belong to implementors.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Issue `method path` with an optional JSON body and return the JSON
    /// response. An empty body is returned as `Value::Null`.
    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SdkError>;

    /// Base URL of the node, used to derive WebSocket endpoints
    fn base_url(&self) -> &str;
}

/// Helper to deserialize response
pub fn deserialize_response<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, SdkError> {
    serde_json::from_value(value).map_err(|e| SdkError::Serialization(e.to_string()))
}

// ==================== HTTP ====================

/// reqwest-backed node client
#[cfg(feature = "http")]
pub struct HttpNodeClient {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "http")]
impl HttpNodeClient {
    /// Create a client for `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: std::time::Duration) -> Result<Self, SdkError> {
        url::Url::parse(base_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl NodeClient for HttpNodeClient {
    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SdkError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(%method, %url, "node request");

        let request = match method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url).json(&body.unwrap_or(Value::Null)),
        };

        let response = request
            .send()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SdkError::Transport(e.to_string()))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), %url, "node returned error status");
            return Err(SdkError::Node {
                status: status.as_u16(),
                message: text.trim().to_string(),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

// ==================== Mock ====================

type Handler = Arc<dyn Fn(Option<&Value>) -> Result<Value, SdkError> + Send + Sync>;

/// A request observed by [`MockNodeClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Verb
    pub method: HttpMethod,
    /// Path including query string
    pub path: String,
    /// JSON body
    pub body: Option<Value>,
}

/// In-memory node for tests. Routes are looked up by exact path first and
/// then by the path with its query string removed.
#[derive(Clone)]
pub struct MockNodeClient {
    base_url: String,
    routes: Arc<Mutex<HashMap<(HttpMethod, String), Handler>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockNodeClient {
    /// Create a mock serving nothing
    pub fn new() -> Self {
        Self::with_base_url("http://localhost:8669")
    }

    /// Create a mock reporting `base_url`
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            routes: Arc::new(Mutex::new(HashMap::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Serve a fixed JSON value
    pub fn set_response(&self, method: HttpMethod, path: &str, response: Value) {
        self.set_handler(method, path, move |_| Ok(response.clone()));
    }

    /// Fail with a node status error
    pub fn set_error(&self, method: HttpMethod, path: &str, status: u16, message: &str) {
        let message = message.to_string();
        self.set_handler(method, path, move |_| {
            Err(SdkError::Node {
                status,
                message: message.clone(),
            })
        });
    }

    /// Serve a response computed from the request body
    pub fn set_handler<F>(&self, method: HttpMethod, path: &str, handler: F)
    where
        F: Fn(Option<&Value>) -> Result<Value, SdkError> + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .insert((method, path.to_string()), Arc::new(handler));
    }

    /// Answer `POST /logs/event` from an in-memory table the way the node
    /// does: criteria OR-ed, range applied, rows ordered, then paginated.
    pub fn serve_event_logs(&self, logs: Vec<NativeEventLog>) {
        self.set_handler(HttpMethod::Post, "/logs/event", move |body| {
            let query: EventLogQuery =
                serde_json::from_value(body.cloned().unwrap_or(Value::Null))?;
            let mut rows: Vec<&NativeEventLog> = logs
                .iter()
                .filter(|log| {
                    let in_range = query.range.map_or(true, |range| {
                        let at = match range.unit {
                            RangeUnit::Block => u64::from(log.meta.block_number),
                            RangeUnit::Time => log.meta.block_timestamp,
                        };
                        at >= range.from && at <= range.to
                    });
                    in_range
                        && (query.criteria_set.is_empty()
                            || query
                                .criteria_set
                                .iter()
                                .any(|c| c.matches(&log.address, &log.topics)))
                })
                .collect();
            rows.sort_by_key(|log| (log.meta.block_number, log.meta.log_index));
            if query.order == LogOrder::Desc {
                rows.reverse();
            }
            let options = query.options.unwrap_or_default();
            let page: Vec<NativeEventLog> = rows
                .into_iter()
                .skip(options.offset as usize)
                .take(options.limit as usize)
                .cloned()
                .collect();
            Ok(serde_json::to_value(page)?)
        });
    }

    /// Remove every route
    pub fn clear_responses(&self) {
        self.routes.lock().clear();
    }

    /// Requests seen so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Requests to `path` (query string ignored)
    pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| strip_query(&c.path) == path)
            .cloned()
            .collect()
    }

    fn route(&self, method: HttpMethod, path: &str) -> Option<Handler> {
        let routes = self.routes.lock();
        routes
            .get(&(method, path.to_string()))
            .or_else(|| routes.get(&(method, strip_query(path).to_string())))
            .cloned()
    }
}

impl Default for MockNodeClient {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_query(path: &str) -> &str {
    path.split('?').next().unwrap_or(path)
}

#[async_trait]
impl NodeClient for MockNodeClient {
    async fn call(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, SdkError> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.clone(),
        });

        match self.route(method, path) {
            Some(handler) => handler(body.as_ref()),
            None => Err(SdkError::Node {
                status: 404,
                message: format!("no mock route for {} {}", method, path),
            }),
        }
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
