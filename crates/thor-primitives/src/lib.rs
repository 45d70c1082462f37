//! # thor-primitives
//!
//! Fixed-width byte types used on both sides of the JSON-RPC bridge.
//!
//! Native node payloads and Ethereum-style payloads agree on the shape of
//! account addresses (20 bytes) and identifiers (32 bytes), so both layers
//! share these types. `U256` is re-exported from `primitive-types`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};

pub use primitive_types::U256;

/// Block height on the native chain
pub type BlockNumber = u32;

/// Gas amount
pub type Gas = u64;

/// Strip an optional `0x`/`0X` prefix.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
