//! Development helpers (evm_*)

use std::sync::Arc;

use serde_json::Value;

use crate::error::{RpcError, RpcResult};
use crate::handler::RpcContext;
use crate::types::{check_arity, format_u64};

/// evm_mine - Blocks cannot be forced on the native chain; waits until the
/// best block advances and returns its number
pub async fn evm_mine(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let start = ctx.client.best_block().await?.number;
    let interval = ctx.config.mine_poll_interval();

    let wait = async {
        loop {
            tokio::time::sleep(interval).await;
            let best = ctx.client.best_block().await?;
            if best.number > start {
                return Ok::<_, RpcError>(best.number);
            }
        }
    };

    match tokio::time::timeout(ctx.config.mine_timeout(), wait).await {
        Ok(number) => Ok(Value::String(format_u64(u64::from(number?)))),
        Err(_) => Err(RpcError::provider(format!(
            "no new block after {:?}",
            ctx.config.mine_timeout()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use parking_lot::Mutex;
    use serde_json::json;
    use thor_sdk::ws::MockWsConnector;
    use thor_sdk::{HttpMethod, MockNodeClient, ThorClient};

    fn context(node: &MockNodeClient) -> Arc<RpcContext> {
        let config = ProviderConfig {
            mine_poll_interval_ms: 10,
            mine_timeout_secs: 1,
            ..Default::default()
        };
        Arc::new(RpcContext::with_connector(
            ThorClient::new(Arc::new(node.clone())),
            config,
            Arc::new(MockWsConnector::new()),
        ))
    }

    #[tokio::test]
    async fn test_mine_waits_for_next_block() {
        let node = MockNodeClient::new();
        let height = Arc::new(Mutex::new(5u32));
        let counter = Arc::clone(&height);
        node.set_handler(HttpMethod::Get, "/blocks/best", move |_| {
            let mut h = counter.lock();
            let current = *h;
            *h += 1;
            Ok(json!({ "number": current }))
        });
        let mined = evm_mine(context(&node), vec![]).await.unwrap();
        assert_eq!(mined, json!("0x6"));
    }

    #[tokio::test]
    async fn test_mine_times_out() {
        let node = MockNodeClient::new();
        node.set_response(HttpMethod::Get, "/blocks/best", json!({ "number": 5 }));
        let err = evm_mine(context(&node), vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::Provider { .. }));
    }
}
