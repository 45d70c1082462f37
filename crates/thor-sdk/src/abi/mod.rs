//! Solidity ABI codec for functions and events
//!
//! - Encoding function calls and decoding return data
//! - Event selectors, criteria construction from indexed arguments
//! - Log decoding with strict selector checking
//!
//! # Example
//!
//! ```rust
//! use thor_sdk::abi::{encode, decode, function_selector, ParamType, Token};
//! use thor_sdk::Address;
//!
//! let selector = function_selector("transfer(address,uint256)");
//! let args = encode(
//!     &[ParamType::Address, ParamType::Uint(256)],
//!     &[Token::Address(Address::ZERO), Token::uint(1000)],
//! ).unwrap();
//! assert_eq!(args.len(), 64);
//!
//! let balance = decode(&[ParamType::Uint(256)], &[0u8; 32]).unwrap();
//! assert_eq!(balance, vec![Token::uint(0)]);
//! # let _ = selector;
//! ```

mod decode;
mod encode;
mod event;
mod types;

pub use decode::{decode, decode_output, decode_word};
pub use encode::{encode, encode_function_call, encode_tokens, function_selector, parse_type};
pub use event::{
    approval_event, topic_for, transfer_event, DecodedEvent, EventDef, EventParam, IndexedArgs,
};
pub use types::{ParamType, Token, I256};
