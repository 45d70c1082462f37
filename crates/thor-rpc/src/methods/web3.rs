//! Web3 namespace RPC methods (web3_*)

use std::sync::Arc;

use serde_json::Value;
use thor_crypto::keccak256;

use crate::error::RpcResult;
use crate::handler::RpcContext;
use crate::types::{check_arity, parse_hex_bytes, require_param};

/// Client version string
pub const CLIENT_VERSION: &str = concat!("thor-rpc/", env!("CARGO_PKG_VERSION"));

/// web3_clientVersion - Returns the client version
pub async fn web3_client_version(_ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    Ok(Value::String(CLIENT_VERSION.to_string()))
}

/// web3_sha3 - Returns Keccak-256 hash of the given data
pub async fn web3_sha3(_ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let data = parse_hex_bytes(require_param(&params, 0, "data")?)?;
    Ok(Value::String(keccak256(&data).to_hex()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_version_format() {
        let parts: Vec<&str> = CLIENT_VERSION.split('/').collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0], "thor-rpc");
        assert_eq!(parts[1].split('.').count(), 3);
    }

    #[test]
    fn test_keccak256_hello() {
        let data = parse_hex_bytes(&Value::String("0x68656c6c6f".to_string())).unwrap();
        assert_eq!(
            keccak256(&data).to_hex(),
            "0x1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn test_unprefixed_data_rejected() {
        assert!(parse_hex_bytes(&Value::String("68656c6c6f".to_string())).is_err());
    }
}
