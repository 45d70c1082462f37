//! RPC request and response types
//!
//! Parameter parsing turns loosely-typed JSON into sum types once, at the
//! top of each handler. Formatted DTOs serialise absent fields as `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thor_primitives::{strip_hex_prefix, Address, H256, U256};
use thor_sdk::types::{parse_quantity, Revision};

use crate::error::{JsonRpcError, RpcError};

/// JSON-RPC request ID (can be number, string, or null)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// Numeric ID
    Number(u64),
    /// String ID
    String(String),
    /// Null ID
    #[default]
    Null,
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,
    /// Request ID
    #[serde(default)]
    pub id: JsonRpcId,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Vec<Value>,
}

impl JsonRpcRequest {
    /// Request with id 1
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: JsonRpcId::Number(1),
            method: method.into(),
            params,
        }
    }
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID
    pub id: JsonRpcId,
    /// Result (on success); a present `null` is `Some(Value::Null)`
    #[serde(
        default,
        deserialize_with = "deserialize_result",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    /// Error (on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// Keeps an explicit `"result": null` apart from a missing result
fn deserialize_result<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcResponse {
    /// Create success response
    pub fn success(id: JsonRpcId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create error response
    pub fn error(id: JsonRpcId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

// ==================== Block parameters ====================

/// Block reference accepted by `eth_*` methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockParam {
    /// Latest block
    #[default]
    Latest,
    /// Earliest block (genesis)
    Earliest,
    /// Pending block; the native chain exposes no pending block, so this
    /// reads the best block
    Pending,
    /// Safe block (native justified checkpoint)
    Safe,
    /// Finalized block
    Finalized,
    /// Block height
    Number(u32),
    /// Block id
    Hash(H256),
}

impl BlockParam {
    /// Native revision for this reference
    pub fn revision(&self) -> Revision {
        match self {
            BlockParam::Latest | BlockParam::Pending => Revision::Best,
            BlockParam::Earliest => Revision::Number(0),
            BlockParam::Safe => Revision::Justified,
            BlockParam::Finalized => Revision::Finalized,
            BlockParam::Number(n) => Revision::Number(*n),
            BlockParam::Hash(id) => Revision::Id(*id),
        }
    }
}

fn block_number_in_range(value: U256) -> Result<u32, RpcError> {
    if value > U256::from(u32::MAX) {
        return Err(RpcError::provider(format!(
            "block number {} out of range",
            value
        )));
    }
    Ok(value.as_u32())
}

/// Parse a block tag, quantity, 32-byte id or JSON number.
///
/// Negative and out-of-range numbers are provider errors; any other
/// malformed shape is an invalid-params error.
pub fn parse_block_param(value: &Value) -> Result<BlockParam, RpcError> {
    match value {
        Value::String(s) => match s.to_lowercase().as_str() {
            "latest" => Ok(BlockParam::Latest),
            "earliest" => Ok(BlockParam::Earliest),
            "pending" => Ok(BlockParam::Pending),
            "safe" => Ok(BlockParam::Safe),
            "finalized" => Ok(BlockParam::Finalized),
            s if s.starts_with('-') => Err(RpcError::provider(format!(
                "invalid block number: {}",
                s
            ))),
            s if s.starts_with("0x") && s.len() == 66 => H256::from_hex(s)
                .map(BlockParam::Hash)
                .map_err(|e| RpcError::invalid_params(format!("invalid block hash: {}", e))),
            s if s.starts_with("0x") => {
                let number = parse_quantity(s).map_err(|e| {
                    RpcError::invalid_params(format!("invalid block number: {}", e))
                })?;
                block_number_in_range(number).map(BlockParam::Number)
            }
            s => Err(RpcError::invalid_params(format!("invalid block tag: {}", s))),
        },
        Value::Number(n) => match n.as_u64() {
            Some(number) => block_number_in_range(U256::from(number)).map(BlockParam::Number),
            None => Err(RpcError::provider(format!("invalid block number: {}", n))),
        },
        _ => Err(RpcError::invalid_params("block reference must be a string or number")),
    }
}

/// Block param at `index`, `latest` when absent or null
pub fn optional_block_param(params: &[Value], index: usize) -> Result<BlockParam, RpcError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(BlockParam::Latest),
        Some(value) => parse_block_param(value),
    }
}

// ==================== Param helpers ====================

/// Required param at `index`
pub fn require_param<'a>(params: &'a [Value], index: usize, name: &str) -> Result<&'a Value, RpcError> {
    params
        .get(index)
        .ok_or_else(|| RpcError::invalid_params(format!("missing {} parameter", name)))
}

/// Reject calls with more than `max` params
pub fn check_arity(params: &[Value], max: usize) -> Result<(), RpcError> {
    if params.len() > max {
        return Err(RpcError::invalid_params(format!(
            "expected at most {} params, got {}",
            max,
            params.len()
        )));
    }
    Ok(())
}

/// Parse address from JSON value
pub fn parse_address(value: &Value) -> Result<Address, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::invalid_params("address must be a string"))?;
    Address::from_hex(s).map_err(|e| RpcError::invalid_params(format!("invalid address: {}", e)))
}

/// Parse H256 from JSON value
pub fn parse_h256(value: &Value) -> Result<H256, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::invalid_params("hash must be a string"))?;
    H256::from_hex(s).map_err(|e| RpcError::invalid_params(format!("invalid hash: {}", e)))
}

/// Parse hex bytes from JSON value
pub fn parse_hex_bytes(value: &Value) -> Result<Vec<u8>, RpcError> {
    let s = value
        .as_str()
        .ok_or_else(|| RpcError::invalid_params("data must be a hex string"))?;
    if !s.starts_with("0x") && !s.starts_with("0X") {
        return Err(RpcError::invalid_params("data must be 0x-prefixed"));
    }
    hex::decode(strip_hex_prefix(s))
        .map_err(|e| RpcError::invalid_params(format!("invalid hex data: {}", e)))
}

/// Parse a quantity given as `0x` hex string or JSON number. Strings
/// without the prefix are rejected rather than read as decimal.
pub fn parse_u256(value: &Value) -> Result<U256, RpcError> {
    match value {
        Value::String(s) if !s.starts_with("0x") && !s.starts_with("0X") => Err(
            RpcError::invalid_params(format!("quantity must be 0x-prefixed: {}", s)),
        ),
        Value::String(s) => {
            parse_quantity(s).map_err(|e| RpcError::invalid_params(format!("invalid quantity: {}", e)))
        }
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| RpcError::invalid_params(format!("invalid quantity: {}", n))),
        _ => Err(RpcError::invalid_params("quantity must be a hex string")),
    }
}

/// Parse a quantity that must fit in u64
pub fn parse_u64(value: &Value) -> Result<u64, RpcError> {
    let n = parse_u256(value)?;
    if n > U256::from(u64::MAX) {
        return Err(RpcError::invalid_params(format!("quantity {} too large", n)));
    }
    Ok(n.as_u64())
}

/// Optional boolean flag at `index`
pub fn optional_bool(params: &[Value], index: usize, name: &str) -> Result<bool, RpcError> {
    match params.get(index) {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(RpcError::invalid_params(format!("{} must be a boolean", name))),
    }
}

/// Format U256 as hex quantity
pub fn format_u256(value: &U256) -> String {
    format!("0x{:x}", value)
}

/// Format u64 as hex quantity
pub fn format_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Format bytes as hex string
pub fn format_bytes(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

// ==================== Transaction requests ====================

/// Transaction object of `eth_call`, `eth_estimateGas` and
/// `eth_sendTransaction` (raw JSON form)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequestRaw {
    /// Sender
    pub from: Option<String>,
    /// Recipient; absent for contract creation
    pub to: Option<String>,
    /// Gas limit
    pub gas: Option<Value>,
    /// Gas price (ignored by the native fee model)
    pub gas_price: Option<Value>,
    /// Value in wei
    pub value: Option<Value>,
    /// Call data
    #[serde(default, alias = "input")]
    pub data: Option<String>,
    /// Nonce
    pub nonce: Option<Value>,
}

/// Transaction object (parsed form)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionRequest {
    /// Sender
    pub from: Option<Address>,
    /// Recipient; `None` creates a contract
    pub to: Option<Address>,
    /// Gas limit
    pub gas: Option<u64>,
    /// Value in wei
    pub value: U256,
    /// Call data
    pub data: Vec<u8>,
    /// Nonce
    pub nonce: Option<u64>,
}

impl TransactionRequest {
    /// Parse a transaction object; any malformed field is invalid params
    pub fn from_value(value: &Value) -> Result<Self, RpcError> {
        if !value.is_object() {
            return Err(RpcError::invalid_params("transaction must be an object"));
        }
        let raw: TransactionRequestRaw = serde_json::from_value(value.clone())
            .map_err(|e| RpcError::invalid_params(format!("invalid transaction: {}", e)))?;

        let address = |s: Option<String>, field: &str| -> Result<Option<Address>, RpcError> {
            s.map(|s| {
                Address::from_hex(&s)
                    .map_err(|e| RpcError::invalid_params(format!("invalid {}: {}", field, e)))
            })
            .transpose()
        };

        Ok(Self {
            from: address(raw.from, "from")?,
            to: address(raw.to, "to")?,
            gas: raw.gas.as_ref().map(parse_u64).transpose()?,
            value: raw.value.as_ref().map(parse_u256).transpose()?.unwrap_or_default(),
            data: raw
                .data
                .map(|d| parse_hex_bytes(&Value::String(d)))
                .transpose()?
                .unwrap_or_default(),
            nonce: raw.nonce.as_ref().map(parse_u64).transpose()?,
        })
    }
}

// ==================== Formatted DTOs ====================

/// RPC block representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    /// Block hash
    pub hash: String,
    /// Parent block hash
    pub parent_hash: String,
    /// Sha3 uncles hash
    pub sha3_uncles: String,
    /// Miner/coinbase address
    pub miner: String,
    /// State root
    pub state_root: String,
    /// Transactions root
    pub transactions_root: String,
    /// Receipts root
    pub receipts_root: String,
    /// Logs bloom
    pub logs_bloom: String,
    /// Difficulty
    pub difficulty: String,
    /// Block number
    pub number: String,
    /// Gas limit
    pub gas_limit: String,
    /// Gas used
    pub gas_used: String,
    /// Timestamp
    pub timestamp: String,
    /// Extra data
    pub extra_data: String,
    /// Mix hash
    pub mix_hash: String,
    /// Nonce
    pub nonce: String,
    /// Base fee per gas
    pub base_fee_per_gas: String,
    /// Total difficulty
    pub total_difficulty: String,
    /// Block size
    pub size: String,
    /// Transactions (hashes or full objects)
    pub transactions: Vec<Value>,
    /// Uncles
    pub uncles: Vec<String>,
}

/// RPC transaction representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    /// Transaction hash
    pub hash: String,
    /// Nonce
    pub nonce: String,
    /// Block hash (null if pending)
    pub block_hash: Option<String>,
    /// Block number (null if pending)
    pub block_number: Option<String>,
    /// Transaction index (null if pending)
    pub transaction_index: Option<String>,
    /// From address
    pub from: String,
    /// To address (null for contract creation)
    pub to: Option<String>,
    /// Value
    pub value: String,
    /// Gas limit
    pub gas: String,
    /// Gas price
    pub gas_price: String,
    /// Input data
    pub input: String,
    /// V
    pub v: String,
    /// R
    pub r: String,
    /// S
    pub s: String,
    /// Transaction type
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Chain ID
    pub chain_id: String,
    /// Max fee per gas (null for legacy transactions)
    pub max_fee_per_gas: Option<String>,
    /// Max priority fee per gas (null for legacy transactions)
    pub max_priority_fee_per_gas: Option<String>,
}

/// RPC receipt representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    /// Transaction hash
    pub transaction_hash: String,
    /// Transaction index
    pub transaction_index: String,
    /// Block hash
    pub block_hash: String,
    /// Block number
    pub block_number: String,
    /// From address
    pub from: String,
    /// To address (null for contract creation)
    pub to: Option<String>,
    /// Cumulative gas used
    pub cumulative_gas_used: String,
    /// Gas used
    pub gas_used: String,
    /// Contract address (null unless the transaction created one)
    pub contract_address: Option<String>,
    /// Logs
    pub logs: Vec<RpcLog>,
    /// Logs bloom
    pub logs_bloom: String,
    /// Transaction type
    #[serde(rename = "type")]
    pub tx_type: String,
    /// Status (1 = success, 0 = failure)
    pub status: String,
    /// Effective gas price
    pub effective_gas_price: String,
}

/// RPC log representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    /// Log address
    pub address: String,
    /// Log topics
    pub topics: Vec<String>,
    /// Log data
    pub data: String,
    /// Block hash
    pub block_hash: String,
    /// Block number
    pub block_number: String,
    /// Transaction hash
    pub transaction_hash: String,
    /// Transaction index
    pub transaction_index: String,
    /// Log index
    pub log_index: String,
    /// Removed by a chain reorganisation
    pub removed: bool,
}
