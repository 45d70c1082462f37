//! # thor-sdk
//!
//! Rust client for a Thor node's native REST and WebSocket API.
//!
//! ## Features
//!
//! - **ThorClient**: typed access to blocks, transactions, accounts and logs
//! - **Filter engine**: event criteria, ordered log queries, strict decoding
//! - **Subscriptions**: block and event pushes fanned out to listeners
//! - **Wallet**: local secp256k1 keys signing native transactions
//! - **ABI**: Solidity ABI encoding and decoding for functions and events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thor_sdk::{LocalSigner, MockNodeClient, Signer, ThorClient, TxBuilder};
//! use thor_sdk::types::Revision;
//! use thor_sdk::{Address, U256};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Mock transport for offline use
//!     let client = ThorClient::new(Arc::new(MockNodeClient::new()));
//!
//!     let signer = LocalSigner::new_random();
//!     let account = client.get_account(&signer.address(), Revision::Best).await?;
//!     println!("Balance: {}", account.balance);
//!
//!     let body = TxBuilder::new(client.chain_tag().await?)
//!         .clause(Some(Address::ZERO), U256::from(1u64), vec![])
//!         .build()?;
//!     let raw = signer.sign_transaction(&body)?;
//!     let id = client.send_raw_transaction(&raw).await?;
//!     println!("Sent {}", id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Filtering Events
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use thor_sdk::abi::{transfer_event, IndexedArgs, Token};
//! use thor_sdk::logs::EventFilter;
//! use thor_sdk::types::{LogOrder, LogRange};
//! use thor_sdk::{Address, MockNodeClient, ThorClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ThorClient::new(Arc::new(MockNodeClient::new()));
//!     let recipient = Address::from_hex("0x7567d83b7b8d80addcb281a71d54fc7b3364ffed")?;
//!
//!     // Transfers to `recipient`, any sender
//!     let filter = EventFilter::new(
//!         transfer_event(),
//!         None,
//!         &IndexedArgs::Positional(vec![None, Some(Token::Address(recipient))]),
//!     )?;
//!     let logs = client
//!         .filter_event_logs(&[filter], Some(LogRange::blocks(0, 1000)), None, LogOrder::Asc)
//!         .await?;
//!     for log in logs {
//!         println!("{:?}", log.decoded.values());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
pub mod client;
pub mod contract;
mod error;
pub mod logs;
pub mod subscriptions;
mod thor;
pub mod tx;
pub mod types;
mod wallet;
pub mod ws;

// Re-export main types
pub use client::{HttpMethod, MockNodeClient, NodeClient};
pub use error::{SdkError, SdkResult};
pub use thor::ThorClient;
pub use tx::{TxBody, TxBuilder};
pub use wallet::{LocalSigner, LocalWallet, Signer, Wallet};

#[cfg(feature = "http")]
pub use client::HttpNodeClient;

// Re-export primitives for convenience
pub use thor_primitives::{Address, BlockNumber, Gas, H256, U256};
