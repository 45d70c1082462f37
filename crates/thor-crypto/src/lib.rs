//! # thor-crypto
//!
//! Cryptographic helpers needed by the SDK and the JSON-RPC layer:
//!
//! - Keccak-256 hashing (event selectors, `web3_sha3`, signing hashes)
//! - secp256k1 signing with 65-byte `r || s || recovery_id` signatures
//! - Public key recovery and address derivation

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod hash;
mod signature;

pub use error::CryptoError;
pub use hash::keccak256;
pub use signature::{
    public_key_to_address, recover_address, recover_public_key, sign, verify, PrivateKey,
    PublicKey, Signature,
};
