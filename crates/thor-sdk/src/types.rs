//! Native node data shapes
//!
//! These mirror the JSON returned by the node REST API. They are decoded
//! once and never mutated; the JSON-RPC layer derives its own DTOs from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thor_primitives::{strip_hex_prefix, Address, H256, U256};

use crate::SdkError;

/// Parse a quantity written as `0x` hex or as a decimal string.
pub fn parse_quantity(s: &str) -> Result<U256, SdkError> {
    let trimmed = s.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        let digits = strip_hex_prefix(trimmed);
        if digits.is_empty() {
            return Ok(U256::zero());
        }
        U256::from_str_radix(digits, 16)
            .map_err(|e| SdkError::InvalidHex(format!("{}: {}", s, e)))
    } else {
        U256::from_dec_str(trimmed).map_err(|e| SdkError::InvalidHex(format!("{}: {:?}", s, e)))
    }
}

/// Serde helpers for `U256` quantities. Accepts hex strings, decimal
/// strings or JSON numbers; writes `0x` hex.
pub mod quantity {
    use super::parse_quantity;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use serde_json::Value;
    use thor_primitives::U256;

    /// Serialize as `0x` hex
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{:x}", value))
    }

    /// Deserialize from hex, decimal or number
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        from_value(Value::deserialize(deserializer)?).map_err(D::Error::custom)
    }

    pub(crate) fn from_value(value: Value) -> Result<U256, String> {
        match value {
            Value::String(s) => parse_quantity(&s).map_err(|e| e.to_string()),
            Value::Number(n) => n
                .as_u64()
                .map(U256::from)
                .ok_or_else(|| format!("not a non-negative integer: {}", n)),
            Value::Null => Ok(U256::zero()),
            other => Err(format!("invalid quantity: {}", other)),
        }
    }

    /// Optional quantities
    pub mod option {
        use super::from_value;
        use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
        use serde_json::Value;
        use thor_primitives::U256;

        /// Serialize as `0x` hex or null
        pub fn serialize<S: Serializer>(
            value: &Option<U256>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_str(&format!("0x{:x}", v)),
                None => serializer.serialize_none(),
            }
        }

        /// Deserialize, mapping null to `None`
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<U256>, D::Error> {
            match Value::deserialize(deserializer)? {
                Value::Null => Ok(None),
                other => from_value(other).map(Some).map_err(D::Error::custom),
            }
        }
    }
}

/// Byte string carried as `0x` hex in JSON.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct HexBytes(pub Vec<u8>);

impl HexBytes {
    /// Raw bytes
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Hex with `0x` prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    /// Whether there are no bytes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for HexBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Vec<u8>> for HexBytes {
    fn from(bytes: Vec<u8>) -> Self {
        HexBytes(bytes)
    }
}

impl FromStr for HexBytes {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s);
        if digits.len() % 2 == 1 {
            return Ok(HexBytes(hex::decode(format!("0{}", digits))?));
        }
        Ok(HexBytes(hex::decode(digits)?))
    }
}

impl Serialize for HexBytes {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexBytes {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        match s {
            Some(s) => s.parse().map_err(serde::de::Error::custom),
            None => Ok(HexBytes::default()),
        }
    }
}

// ==================== Revisions ====================

/// Block revision accepted by the node in path and query segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Revision {
    /// Head of the canonical chain
    #[default]
    Best,
    /// Latest finalized block
    Finalized,
    /// Latest justified block
    Justified,
    /// Block height
    Number(u32),
    /// Block id
    Id(H256),
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Revision::Best => f.write_str("best"),
            Revision::Finalized => f.write_str("finalized"),
            Revision::Justified => f.write_str("justified"),
            Revision::Number(n) => write!(f, "{}", n),
            Revision::Id(id) => write!(f, "{}", id),
        }
    }
}

// ==================== Blocks ====================

/// Block as returned by `GET /blocks/{revision}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeBlock {
    /// Height
    pub number: u32,
    /// Block id
    pub id: H256,
    /// Encoded size in bytes
    pub size: u64,
    /// Parent block id
    #[serde(rename = "parentID")]
    pub parent_id: H256,
    /// Unix timestamp in seconds
    pub timestamp: u64,
    /// Gas limit
    pub gas_limit: u64,
    /// Reward recipient
    pub beneficiary: Address,
    /// Gas consumed by all transactions
    pub gas_used: u64,
    /// Accumulated witness score
    pub total_score: u64,
    /// Transactions trie root
    pub txs_root: H256,
    /// Supported transaction features bitset
    pub txs_features: u32,
    /// State trie root
    pub state_root: H256,
    /// Receipts trie root
    pub receipts_root: H256,
    /// Whether the signer voted for the commit
    pub com: bool,
    /// Block producer
    pub signer: Address,
    /// On the canonical chain
    pub is_trunk: bool,
    /// Finalized
    pub is_finalized: bool,
    /// Base fee, present after the dynamic fee fork
    #[serde(with = "quantity::option", skip_serializing_if = "Option::is_none")]
    pub base_fee_per_gas: Option<U256>,
    /// Transaction ids, or full transactions when `expanded=true`
    pub transactions: BlockTransactions,
}

/// Transactions embedded in a block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    /// Transaction ids only
    Ids(Vec<H256>),
    /// Full transactions with their receipts
    Expanded(Vec<ExpandedTransaction>),
}

impl Default for BlockTransactions {
    fn default() -> Self {
        BlockTransactions::Ids(Vec::new())
    }
}

impl BlockTransactions {
    /// Number of transactions
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Ids(ids) => ids.len(),
            BlockTransactions::Expanded(txs) => txs.len(),
        }
    }

    /// Whether the block has no transactions
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transaction ids in block order
    pub fn ids(&self) -> Vec<H256> {
        match self {
            BlockTransactions::Ids(ids) => ids.clone(),
            BlockTransactions::Expanded(txs) => txs.iter().map(|tx| tx.id).collect(),
        }
    }

    /// Position of `id` within the block
    pub fn index_of(&self, id: &H256) -> Option<usize> {
        match self {
            BlockTransactions::Ids(ids) => ids.iter().position(|x| x == id),
            BlockTransactions::Expanded(txs) => txs.iter().position(|tx| &tx.id == id),
        }
    }
}

// ==================== Transactions ====================

/// One clause of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeClause {
    /// Recipient; `None` deploys a contract
    pub to: Option<Address>,
    /// VET amount in wei
    #[serde(with = "quantity")]
    pub value: U256,
    /// Call data or init code
    #[serde(default)]
    pub data: HexBytes,
}

/// Block placement of a transaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMeta {
    /// Block id
    #[serde(rename = "blockID")]
    pub block_id: H256,
    /// Block height
    pub block_number: u32,
    /// Block timestamp
    pub block_timestamp: u64,
}

/// Transaction as returned by `GET /transactions/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeTransaction {
    /// Transaction id
    pub id: H256,
    /// 0 for legacy, 81 for dynamic fee transactions
    #[serde(rename = "type")]
    pub tx_type: Option<u8>,
    /// Last byte of the genesis id
    pub chain_tag: u8,
    /// Reference block prefix, 8 bytes hex
    pub block_ref: String,
    /// Lifetime in blocks after `block_ref`
    pub expiration: u32,
    /// Clauses in execution order
    pub clauses: Vec<NativeClause>,
    /// Legacy gas price coefficient
    pub gas_price_coef: Option<u8>,
    /// Dynamic fee cap
    #[serde(with = "quantity::option", skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    /// Dynamic fee tip
    #[serde(with = "quantity::option", skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    /// Gas limit
    pub gas: u64,
    /// Signer
    pub origin: Address,
    /// Fee delegator, if any
    pub delegator: Option<Address>,
    /// Client-chosen nonce
    #[serde(with = "quantity")]
    pub nonce: U256,
    /// Transaction this one depends on
    pub depends_on: Option<H256>,
    /// Encoded size
    pub size: u64,
    /// Placement; `None` while pending
    pub meta: Option<TxMeta>,
}

/// Transaction embedded in an expanded block, receipt fields inlined
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpandedTransaction {
    /// Transaction id
    pub id: H256,
    /// 0 for legacy, 81 for dynamic fee transactions
    #[serde(rename = "type")]
    pub tx_type: Option<u8>,
    /// Last byte of the genesis id
    pub chain_tag: u8,
    /// Reference block prefix
    pub block_ref: String,
    /// Lifetime in blocks
    pub expiration: u32,
    /// Clauses
    pub clauses: Vec<NativeClause>,
    /// Legacy gas price coefficient
    pub gas_price_coef: Option<u8>,
    /// Gas limit
    pub gas: u64,
    /// Signer
    pub origin: Address,
    /// Fee delegator
    pub delegator: Option<Address>,
    /// Nonce
    #[serde(with = "quantity")]
    pub nonce: U256,
    /// Dependency
    pub depends_on: Option<H256>,
    /// Encoded size
    pub size: u64,
    /// Gas used
    pub gas_used: u64,
    /// Account that paid the fee
    pub gas_payer: Address,
    /// Energy paid
    #[serde(with = "quantity")]
    pub paid: U256,
    /// Energy rewarded to the producer
    #[serde(with = "quantity")]
    pub reward: U256,
    /// Execution reverted
    pub reverted: bool,
    /// Per-clause outputs
    pub outputs: Vec<NativeOutput>,
}

// ==================== Receipts ====================

/// Receipt placement
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMeta {
    /// Block id
    #[serde(rename = "blockID")]
    pub block_id: H256,
    /// Block height
    pub block_number: u32,
    /// Block timestamp
    pub block_timestamp: u64,
    /// Transaction id
    #[serde(rename = "txID")]
    pub tx_id: H256,
    /// Transaction signer
    pub tx_origin: Address,
}

/// Event emitted inside a clause
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEvent {
    /// Emitting contract
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(default)]
    pub data: HexBytes,
}

/// VET transfer inside a clause
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeTransfer {
    /// Sender
    pub sender: Address,
    /// Recipient
    pub recipient: Address,
    /// Amount
    #[serde(with = "quantity")]
    pub amount: U256,
}

/// Result of one clause
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeOutput {
    /// Address of a contract created by the clause
    pub contract_address: Option<Address>,
    /// Events in emission order
    pub events: Vec<NativeEvent>,
    /// Transfers in order
    pub transfers: Vec<NativeTransfer>,
}

/// Receipt as returned by `GET /transactions/{id}/receipt`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeReceipt {
    /// Transaction type
    #[serde(rename = "type")]
    pub tx_type: Option<u8>,
    /// Gas used
    pub gas_used: u64,
    /// Account that paid the fee
    pub gas_payer: Address,
    /// Energy paid
    #[serde(with = "quantity")]
    pub paid: U256,
    /// Energy rewarded to the producer
    #[serde(with = "quantity")]
    pub reward: U256,
    /// Execution reverted
    pub reverted: bool,
    /// Placement
    pub meta: ReceiptMeta,
    /// Per-clause outputs
    pub outputs: Vec<NativeOutput>,
}

// ==================== Accounts ====================

/// Account state as returned by `GET /accounts/{address}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeAccount {
    /// VET balance
    #[serde(with = "quantity")]
    pub balance: U256,
    /// VTHO balance
    #[serde(with = "quantity")]
    pub energy: U256,
    /// Whether code is deployed
    #[serde(default)]
    pub has_code: bool,
}

/// Clause to simulate with `POST /accounts/*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectRequest {
    /// Clauses to run in order
    pub clauses: Vec<NativeClause>,
    /// Caller address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caller: Option<Address>,
    /// Gas limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Gas payer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_payer: Option<Address>,
}

/// One clause result of `POST /accounts/*`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NativeCallResult {
    /// Return data
    pub data: HexBytes,
    /// Events emitted
    pub events: Vec<NativeEvent>,
    /// Transfers made
    pub transfers: Vec<NativeTransfer>,
    /// Gas used
    pub gas_used: u64,
    /// Execution reverted
    pub reverted: bool,
    /// VM error text when reverted
    pub vm_error: String,
}

// ==================== Event logs ====================

/// Placement of an event log
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMeta {
    /// Block id
    #[serde(rename = "blockID")]
    pub block_id: H256,
    /// Block height
    pub block_number: u32,
    /// Block timestamp
    pub block_timestamp: u64,
    /// Transaction id
    #[serde(rename = "txID")]
    pub tx_id: H256,
    /// Transaction signer
    pub tx_origin: Address,
    /// Clause position
    #[serde(default)]
    pub clause_index: u32,
    /// Transaction position, present when indexes were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_index: Option<u32>,
    /// Log position in block, present when indexes were requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_index: Option<u32>,
}

/// Row returned by `POST /logs/event`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeEventLog {
    /// Emitting contract
    pub address: Address,
    /// Topics
    pub topics: Vec<H256>,
    /// Non-indexed data
    #[serde(default)]
    pub data: HexBytes,
    /// Placement
    pub meta: LogMeta,
}

/// Topic filter tuple: an address plus up to five topic slots. Unset
/// fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventCriteria {
    /// Emitting contract
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Slot 0 (event selector for non-anonymous events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic0: Option<H256>,
    /// Slot 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic1: Option<H256>,
    /// Slot 2
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic2: Option<H256>,
    /// Slot 3
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic3: Option<H256>,
    /// Slot 4
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic4: Option<H256>,
}

impl EventCriteria {
    /// Slots in order
    pub fn topics(&self) -> [Option<H256>; 5] {
        [self.topic0, self.topic1, self.topic2, self.topic3, self.topic4]
    }

    /// Set slot `index` (0..=4); other indexes are ignored
    pub fn set_topic(&mut self, index: usize, topic: H256) {
        match index {
            0 => self.topic0 = Some(topic),
            1 => self.topic1 = Some(topic),
            2 => self.topic2 = Some(topic),
            3 => self.topic3 = Some(topic),
            4 => self.topic4 = Some(topic),
            _ => {}
        }
    }

    /// Whether a log with this address and topics satisfies every set field
    pub fn matches(&self, address: &Address, topics: &[H256]) -> bool {
        if let Some(expected) = &self.address {
            if expected != address {
                return false;
            }
        }
        self.topics()
            .iter()
            .enumerate()
            .all(|(i, slot)| match slot {
                Some(expected) => topics.get(i) == Some(expected),
                None => true,
            })
    }
}

/// Range unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeUnit {
    /// Block heights
    #[default]
    Block,
    /// Unix timestamps
    Time,
}

/// Inclusive bounds of a log query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LogRange {
    /// Unit of `from` and `to`
    pub unit: RangeUnit,
    /// Lower bound
    pub from: u64,
    /// Upper bound
    pub to: u64,
}

impl LogRange {
    /// Block range
    pub fn blocks(from: u64, to: u64) -> Self {
        Self {
            unit: RangeUnit::Block,
            from,
            to,
        }
    }
}

/// Pagination for log queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogOptions {
    /// Rows to skip
    pub offset: u64,
    /// Maximum rows to return
    pub limit: u64,
    /// Ask the node for `txIndex`/`logIndex`
    #[serde(default)]
    pub include_indexes: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 1000,
            include_indexes: true,
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOrder {
    /// Oldest first
    #[default]
    Asc,
    /// Newest first
    Desc,
}

/// Body of `POST /logs/event`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogQuery {
    /// Bounds; `None` leaves the window to the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<LogRange>,
    /// Pagination
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<LogOptions>,
    /// Criteria, OR-ed together
    pub criteria_set: Vec<EventCriteria>,
    /// Ordering
    pub order: LogOrder,
}
