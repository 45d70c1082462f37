//! Request handler and method dispatcher

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use thor_primitives::{Address, H256};
use thor_sdk::ws::WsConnector;
use thor_sdk::{Signer, ThorClient, Wallet};
use tokio::sync::OnceCell;

use crate::config::ProviderConfig;
use crate::error::{JsonRpcError, RpcError, RpcResult};
use crate::methods::{debug, eth, evm, net, unsupported, web3};
use crate::pubsub::SubscriptionManager;
use crate::types::{JsonRpcRequest, JsonRpcResponse};

/// Type alias for async method handler
pub type MethodFn = Box<
    dyn Fn(Arc<RpcContext>, Vec<Value>) -> Pin<Box<dyn Future<Output = RpcResult<Value>> + Send>>
        + Send
        + Sync,
>;

/// Genesis id of the main network
pub const MAINNET_GENESIS_ID: &str =
    "0x00000000851caf3cfdb6e899cf5958bfb1ac3413d346d43539627e6be7ec1b4a";
/// Genesis id of the test network
pub const TESTNET_GENESIS_ID: &str =
    "0x000000000b2bce3c70bc649a02749e8687721b09ed2e15997f466536b20bb127";
/// Chain id reported on the main network
pub const MAINNET_CHAIN_ID: u64 = 0x186a9;
/// Chain id reported on the test network
pub const TESTNET_CHAIN_ID: u64 = 0x186aa;

/// Chain id for a genesis block id: the well-known networks have fixed
/// ids, anything else reports its chain tag.
pub fn chain_id_for_genesis(genesis_id: &H256) -> u64 {
    let hex = genesis_id.to_hex();
    if hex == MAINNET_GENESIS_ID {
        MAINNET_CHAIN_ID
    } else if hex == TESTNET_GENESIS_ID {
        TESTNET_CHAIN_ID
    } else {
        u64::from(genesis_id.as_bytes()[31])
    }
}

/// Shared context for RPC handlers
pub struct RpcContext {
    /// Native node access
    pub client: ThorClient,
    /// Provider settings
    pub config: ProviderConfig,
    /// Accounts available to `eth_accounts` and `eth_sendTransaction`
    pub wallet: Option<Arc<dyn Wallet>>,
    /// `eth_subscribe` state
    pub subscriptions: SubscriptionManager,
    chain_id: OnceCell<u64>,
}

impl RpcContext {
    /// Context with the default WebSocket connector and no wallet
    pub fn new(client: ThorClient, config: ProviderConfig) -> Self {
        Self::with_connector(client, config, Arc::new(thor_sdk::ws::TungsteniteConnector))
    }

    /// Context using `connector` for subscriptions
    pub fn with_connector(
        client: ThorClient,
        config: ProviderConfig,
        connector: Arc<dyn WsConnector>,
    ) -> Self {
        let subscriptions = SubscriptionManager::new(config.ws_base_url(), connector);
        Self {
            client,
            config,
            wallet: None,
            subscriptions,
            chain_id: OnceCell::new(),
        }
    }

    /// Attach a wallet
    pub fn with_wallet(mut self, wallet: Arc<dyn Wallet>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    /// Chain id: the configured override, else derived once from the
    /// genesis block
    pub async fn chain_id(&self) -> RpcResult<u64> {
        if let Some(chain_id) = self.config.chain_id {
            return Ok(chain_id);
        }
        self.chain_id
            .get_or_try_init(|| async {
                let genesis = self.client.genesis_block().await?;
                Ok::<_, RpcError>(chain_id_for_genesis(&genesis.id))
            })
            .await
            .copied()
    }

    /// Wallet accounts in wallet order; empty without a wallet
    pub fn accounts(&self) -> Vec<Address> {
        self.wallet
            .as_ref()
            .map(|wallet| wallet.accounts())
            .unwrap_or_default()
    }

    /// Accounts, failing when there are none
    pub fn require_accounts(&self) -> RpcResult<Vec<Address>> {
        let accounts = self.accounts();
        if accounts.is_empty() {
            return Err(RpcError::MissingSigner(match self.wallet {
                Some(_) => "wallet has no accounts".to_string(),
                None => "no wallet attached".to_string(),
            }));
        }
        Ok(accounts)
    }

    /// Signer for `address`
    pub fn signer(&self, address: &Address) -> RpcResult<Arc<dyn Signer>> {
        let wallet = self
            .wallet
            .as_ref()
            .ok_or_else(|| RpcError::MissingSigner("no wallet attached".to_string()))?;
        wallet
            .signer(address)
            .ok_or_else(|| RpcError::MissingSigner(format!("no signer for {}", address)))
    }
}

impl std::fmt::Debug for RpcContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcContext")
            .field("config", &self.config)
            .field("accounts", &self.accounts().len())
            .field("subscriptions", &self.subscriptions)
            .finish()
    }
}

/// Method registry for dispatching RPC calls
pub struct MethodRegistry {
    methods: HashMap<String, MethodFn>,
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    /// Create a new method registry with all methods registered
    pub fn new() -> Self {
        let mut registry = Self {
            methods: HashMap::new(),
        };

        // Chain and node status
        registry.register("eth_chainId", eth::eth_chain_id);
        registry.register("eth_blockNumber", eth::eth_block_number);
        registry.register("eth_syncing", eth::eth_syncing);
        registry.register("eth_gasPrice", eth::eth_gas_price);

        // Accounts and state
        registry.register("eth_accounts", eth::eth_accounts);
        registry.register("eth_requestAccounts", eth::eth_request_accounts);
        registry.register("eth_getBalance", eth::eth_get_balance);
        registry.register("eth_getCode", eth::eth_get_code);
        registry.register("eth_getStorageAt", eth::eth_get_storage_at);
        registry.register("eth_getTransactionCount", eth::eth_get_transaction_count);

        // Execution
        registry.register("eth_call", eth::eth_call);
        registry.register("eth_estimateGas", eth::eth_estimate_gas);
        registry.register("eth_sendRawTransaction", eth::eth_send_raw_transaction);
        registry.register("eth_sendTransaction", eth::eth_send_transaction);
        registry.register("eth_signTransaction", eth::eth_sign_transaction);

        // Blocks
        registry.register("eth_getBlockByNumber", eth::eth_get_block_by_number);
        registry.register("eth_getBlockByHash", eth::eth_get_block_by_hash);
        registry.register(
            "eth_getBlockTransactionCountByNumber",
            eth::eth_get_block_transaction_count_by_number,
        );
        registry.register(
            "eth_getBlockTransactionCountByHash",
            eth::eth_get_block_transaction_count_by_hash,
        );
        registry.register("eth_getBlockReceipts", eth::eth_get_block_receipts);

        // Transactions and receipts
        registry.register("eth_getTransactionByHash", eth::eth_get_transaction_by_hash);
        registry.register(
            "eth_getTransactionByBlockNumberAndIndex",
            eth::eth_get_transaction_by_block_number_and_index,
        );
        registry.register(
            "eth_getTransactionByBlockHashAndIndex",
            eth::eth_get_transaction_by_block_hash_and_index,
        );
        registry.register("eth_getTransactionReceipt", eth::eth_get_transaction_receipt);

        // Logs and subscriptions
        registry.register("eth_getLogs", eth::eth_get_logs);
        registry.register("eth_subscribe", eth::eth_subscribe);
        registry.register("eth_unsubscribe", eth::eth_unsubscribe);

        // Register net_* methods
        registry.register("net_version", net::net_version);
        registry.register("net_listening", net::net_listening);
        registry.register("net_peerCount", net::net_peer_count);

        // Register web3_* methods
        registry.register("web3_clientVersion", web3::web3_client_version);
        registry.register("web3_sha3", web3::web3_sha3);

        // Register debug_* methods
        registry.register("debug_traceTransaction", debug::debug_trace_transaction);
        registry.register("debug_traceCall", debug::debug_trace_call);

        // Register evm_* methods
        registry.register("evm_mine", evm::evm_mine);

        for name in unsupported::METHODS.iter().copied() {
            registry.register_unsupported(name);
        }

        registry
    }

    /// Register a method handler
    pub fn register<F, Fut>(&mut self, name: &str, handler: F)
    where
        F: Fn(Arc<RpcContext>, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RpcResult<Value>> + Send + 'static,
    {
        self.methods.insert(
            name.to_string(),
            Box::new(move |ctx, params| Box::pin(handler(ctx, params))),
        );
    }

    /// Register a method whose handler always fails with NotImplemented
    pub fn register_unsupported(&mut self, name: &'static str) {
        self.register(name, move |_ctx, _params| async move {
            Err::<Value, _>(RpcError::NotImplemented(name.to_string()))
        });
    }

    /// Dispatch a method call
    pub async fn dispatch(
        &self,
        ctx: Arc<RpcContext>,
        method: &str,
        params: Vec<Value>,
    ) -> RpcResult<Value> {
        tracing::debug!(%method, params = params.len(), "dispatch");
        match self.methods.get(method) {
            Some(handler) => {
                let result = handler(ctx, params).await;
                if let Err(RpcError::Provider { message, .. }) = &result {
                    tracing::warn!(%method, %message, "native call failed");
                }
                result
            }
            None => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    /// Check if a method is registered
    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Get list of registered methods
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(|s| s.as_str()).collect()
    }
}

/// RPC request handler
pub struct RpcHandler {
    ctx: Arc<RpcContext>,
    registry: MethodRegistry,
}

impl RpcHandler {
    /// Create a new RPC handler
    pub fn new(ctx: Arc<RpcContext>) -> Self {
        Self {
            ctx,
            registry: MethodRegistry::new(),
        }
    }

    /// Shared context
    pub fn context(&self) -> &Arc<RpcContext> {
        &self.ctx
    }

    /// Method registry
    pub fn registry(&self) -> &MethodRegistry {
        &self.registry
    }

    /// Dispatch by name
    pub async fn call(&self, method: &str, params: Vec<Value>) -> RpcResult<Value> {
        self.registry
            .dispatch(Arc::clone(&self.ctx), method, params)
            .await
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        // Validate JSON-RPC version
        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request("invalid JSON-RPC version"),
            );
        }

        match self.call(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(error) => JsonRpcResponse::error(request.id, error.into()),
        }
    }
}
