//! Provider façade
//!
//! [`Provider`] is the object applications hold: it routes requests through
//! the method registry, carries the optional wallet and exposes the
//! `eth_subscription` notification stream.

use std::sync::Arc;

use serde_json::Value;
use thor_sdk::{ThorClient, Wallet};
use tokio::sync::broadcast;

use crate::config::ProviderConfig;
use crate::error::{JsonRpcError, RpcError, RpcResult};
use crate::handler::{RpcContext, RpcHandler};
use crate::types::{JsonRpcId, JsonRpcRequest, JsonRpcResponse};

/// Ethereum JSON-RPC provider over a native node
pub struct Provider {
    handler: RpcHandler,
}

impl Provider {
    /// Provider over an existing context
    pub fn new(ctx: RpcContext) -> Self {
        Self {
            handler: RpcHandler::new(Arc::new(ctx)),
        }
    }

    /// Connect to `config.node_url` over HTTP, without a wallet
    pub fn connect(config: ProviderConfig) -> RpcResult<Self> {
        let client = ThorClient::connect(&config.node_url, config.request_timeout())?;
        tracing::info!(node = %config.node_url, "provider connected");
        Ok(Self::new(RpcContext::new(client, config)))
    }

    /// Connect with a wallet for account-sensitive methods
    pub fn connect_with_wallet(config: ProviderConfig, wallet: Arc<dyn Wallet>) -> RpcResult<Self> {
        let client = ThorClient::connect(&config.node_url, config.request_timeout())?;
        tracing::info!(
            node = %config.node_url,
            accounts = wallet.accounts().len(),
            "provider connected"
        );
        Ok(Self::new(RpcContext::new(client, config).with_wallet(wallet)))
    }

    /// Shared context
    pub fn context(&self) -> &Arc<RpcContext> {
        self.handler.context()
    }

    /// Call a method; errors keep their kind
    pub async fn request(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        self.handler.call(method, params).await
    }

    /// Answer one JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        self.handler.handle_request(request).await
    }

    /// Answer a raw JSON body: a single request object or a batch array.
    /// Entries that are not valid requests get an invalid-request response.
    pub async fn handle_value(&self, body: Value) -> Value {
        match body {
            Value::Array(items) if items.is_empty() => {
                to_value(invalid_request(JsonRpcId::Null, "empty batch"))
            }
            Value::Array(items) => {
                let mut responses = Vec::with_capacity(items.len());
                for item in items {
                    responses.push(to_value(self.handle_entry(item).await));
                }
                Value::Array(responses)
            }
            other => to_value(self.handle_entry(other).await),
        }
    }

    async fn handle_entry(&self, entry: Value) -> JsonRpcResponse {
        let id = entry
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value(id).ok())
            .unwrap_or_default();
        match serde_json::from_value::<JsonRpcRequest>(entry) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => invalid_request(id, &e.to_string()),
        }
    }

    /// `eth_subscription` frames of every active subscription
    pub fn notifications(&self) -> broadcast::Receiver<Value> {
        self.context().subscriptions.notifications()
    }

    /// Close every subscription
    pub fn close(&self) {
        self.context().subscriptions.close_all();
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("context", self.context())
            .finish()
    }
}

fn invalid_request(id: JsonRpcId, message: &str) -> JsonRpcResponse {
    JsonRpcResponse::error(id, JsonRpcError::invalid_request(message))
}

fn to_value(response: JsonRpcResponse) -> Value {
    serde_json::to_value(response).unwrap_or_else(|e| {
        serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "error": JsonRpcError::from(RpcError::provider(e.to_string())),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use thor_sdk::ws::MockWsConnector;
    use thor_sdk::MockNodeClient;

    fn provider() -> Provider {
        Provider::new(RpcContext::with_connector(
            ThorClient::new(Arc::new(MockNodeClient::new())),
            ProviderConfig {
                chain_id: Some(0x27),
                ..Default::default()
            },
            Arc::new(MockWsConnector::new()),
        ))
    }

    #[tokio::test]
    async fn test_request_returns_result() {
        let chain_id = provider().request("eth_chainId", vec![]).await.unwrap();
        assert_eq!(chain_id, json!("0x27"));
    }

    #[tokio::test]
    async fn test_handle_value_single() {
        let response = provider()
            .handle_value(json!({ "jsonrpc": "2.0", "id": 7, "method": "net_version" }))
            .await;
        assert_eq!(response["id"], 7);
        assert_eq!(response["result"], "39");
    }

    #[tokio::test]
    async fn test_handle_value_batch() {
        let response = provider()
            .handle_value(json!([
                { "jsonrpc": "2.0", "id": 1, "method": "eth_chainId" },
                { "jsonrpc": "2.0", "id": 2, "method": "eth_hashrate" },
                { "id": 3 },
            ]))
            .await;
        let items = response.as_array().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["result"], "0x27");
        assert_eq!(items[1]["error"]["code"], 4200);
        assert_eq!(items[2]["error"]["code"], -32600);
        assert_eq!(items[2]["id"], 3);
    }

    #[tokio::test]
    async fn test_handle_value_empty_batch() {
        let response = provider().handle_value(json!([])).await;
        assert_eq!(response["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_wrong_version_rejected() {
        let response = provider()
            .handle_value(json!({ "jsonrpc": "1.0", "id": 1, "method": "eth_chainId" }))
            .await;
        assert_eq!(response["error"]["code"], -32600);
    }
}
