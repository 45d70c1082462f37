//! Network namespace RPC methods (net_*)

use std::sync::Arc;

use serde_json::Value;

use crate::error::RpcResult;
use crate::handler::RpcContext;
use crate::types::{check_arity, format_u64};

/// net_version - Returns the network ID as a decimal string
pub async fn net_version(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    // Network ID is same as chain ID
    Ok(Value::String(ctx.chain_id().await?.to_string()))
}

/// net_listening - Returns true once the node answers
pub async fn net_listening(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    ctx.client.best_block().await?;
    Ok(Value::Bool(true))
}

/// net_peerCount - Returns number of peers connected to the node
pub async fn net_peer_count(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let peers = ctx.client.peers().await?;
    Ok(Value::String(format_u64(peers.len() as u64)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use serde_json::json;
    use thor_sdk::ws::MockWsConnector;
    use thor_sdk::{HttpMethod, MockNodeClient, ThorClient};

    fn context(node: &MockNodeClient) -> Arc<RpcContext> {
        Arc::new(RpcContext::with_connector(
            ThorClient::new(Arc::new(node.clone())),
            ProviderConfig::default(),
            Arc::new(MockWsConnector::new()),
        ))
    }

    #[tokio::test]
    async fn test_net_version_is_decimal() {
        let node = MockNodeClient::new();
        node.set_response(
            HttpMethod::Get,
            "/blocks/0",
            json!({ "number": 0, "id": crate::handler::TESTNET_GENESIS_ID }),
        );
        let version = net_version(context(&node), vec![]).await.unwrap();
        assert_eq!(version, json!("100010"));
    }

    #[tokio::test]
    async fn test_peer_count() {
        let node = MockNodeClient::new();
        node.set_response(HttpMethod::Get, "/node/peers", json!([{ "name": "a" }, { "name": "b" }]));
        assert_eq!(net_peer_count(context(&node), vec![]).await.unwrap(), json!("0x2"));

        node.set_response(HttpMethod::Get, "/node/peers", Value::Null);
        assert_eq!(net_peer_count(context(&node), vec![]).await.unwrap(), json!("0x0"));
    }

    #[tokio::test]
    async fn test_listening_fails_when_node_is_down() {
        let node = MockNodeClient::new();
        node.set_error(HttpMethod::Get, "/blocks/best", 503, "unavailable");
        assert!(net_listening(context(&node), vec![]).await.is_err());
    }
}
