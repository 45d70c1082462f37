//! # thor-rpc
//!
//! Ethereum JSON-RPC 2.0 provider over the Thor native REST/WebSocket API.
//!
//! Requests are dispatched by method name to a handler that validates its
//! params, calls the native node through [`thor_sdk::ThorClient`] and
//! reshapes the result into the Ethereum wire form.
//!
//! ## Features
//!
//! - `eth_*`, `net_*`, `web3_*`, `debug_*` and `evm_*` methods
//! - `eth_subscribe` emulation over native WebSocket subscriptions
//! - Wallet-backed `eth_accounts` / `eth_sendTransaction`
//! - EIP-1193 style errors that keep their kind
//! - Optional HTTP server with CORS support
//!
//! ## Usage
//!
//! ```ignore
//! use thor_rpc::{Provider, ProviderConfig};
//!
//! let provider = Provider::connect(ProviderConfig::new("http://localhost:8669"))?;
//! let block = provider
//!     .request("eth_getBlockByNumber", vec!["latest".into(), false.into()])
//!     .await?;
//! ```
//!
//! ## Supported Methods
//!
//! ### eth_* Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | `eth_chainId` | Chain id derived from the genesis block |
//! | `eth_blockNumber` | Best block height |
//! | `eth_syncing` | `false`, or progress when the best block lags |
//! | `eth_gasPrice` | Base gas price from the params contract |
//! | `eth_accounts` | Wallet accounts |
//! | `eth_requestAccounts` | Wallet accounts; fails without any |
//! | `eth_getBalance` | Account balance |
//! | `eth_getCode` | Contract code |
//! | `eth_getStorageAt` | Storage value at a slot |
//! | `eth_getTransactionCount` | Always `0x0`; nonces are client chosen |
//! | `eth_call` | Simulated call |
//! | `eth_estimateGas` | Execution plus intrinsic gas |
//! | `eth_sendRawTransaction` | Submit a signed native transaction |
//! | `eth_sendTransaction` | Build, sign and submit |
//! | `eth_signTransaction` | Build and sign |
//! | `eth_getBlockByNumber` / `eth_getBlockByHash` | Block by reference |
//! | `eth_getBlockTransactionCountByNumber` / `...ByHash` | Transaction count |
//! | `eth_getBlockReceipts` | All receipts of a block |
//! | `eth_getTransactionByHash` | Transaction by id |
//! | `eth_getTransactionByBlockNumberAndIndex` / `...HashAndIndex` | Transaction by position |
//! | `eth_getTransactionReceipt` | Receipt by transaction id |
//! | `eth_getLogs` | Event logs matching a filter |
//! | `eth_subscribe` / `eth_unsubscribe` | `newHeads` and `logs` subscriptions |
//!
//! ### Other Methods
//!
//! | Method | Description |
//! |--------|-------------|
//! | `net_version` | Chain id in decimal |
//! | `net_listening` | `true` when the node answers |
//! | `net_peerCount` | Connected peers |
//! | `web3_clientVersion` | Provider version |
//! | `web3_sha3` | Keccak-256 of data |
//! | `debug_traceTransaction` | Trace a mined transaction |
//! | `debug_traceCall` | Trace a simulated call |
//! | `evm_mine` | Wait for the next block |
//!
//! Proof-of-work, uncle, filter polling, engine, txpool and raw debug
//! methods are registered and fail with NotImplemented (4200).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod handler;
pub mod methods;
pub mod provider;
pub mod pubsub;
pub mod server;
pub mod types;

// Re-export main types
pub use config::{Config, ConfigError, ProviderConfig};
pub use error::{JsonRpcError, RpcError, RpcResult};
pub use filter::LogFilter;
pub use handler::{MethodRegistry, RpcContext, RpcHandler};
pub use provider::Provider;
pub use pubsub::{SubscriptionKind, SubscriptionManager};
pub use server::{RpcServer, ServerConfig};
pub use types::{
    BlockParam, JsonRpcId, JsonRpcRequest, JsonRpcResponse, RpcBlock, RpcLog, RpcReceipt,
    RpcTransaction, TransactionRequest,
};
