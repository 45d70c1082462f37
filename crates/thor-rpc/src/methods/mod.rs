//! RPC method handlers, one module per namespace

pub mod debug;
pub mod eth;
pub mod evm;
pub mod net;
pub mod unsupported;
pub mod web3;
