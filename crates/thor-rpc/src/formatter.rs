//! Native to JSON-RPC response formatting
//!
//! Pure functions: one native DTO in, one formatted DTO out. Fields the
//! native chain has no equivalent for get fixed placeholders (zero hashes,
//! a zero-filled bloom) so strict Ethereum consumers accept the shape.

use serde::Serialize;
use serde_json::Value;
use thor_primitives::{Address, H256, U256};
use thor_sdk::types::{
    BlockTransactions, ExpandedTransaction, LogMeta, NativeBlock, NativeEventLog,
    NativeReceipt, NativeTransaction, ReceiptMeta, TxMeta,
};

use crate::error::RpcError;
use crate::types::{format_bytes, format_u256, format_u64, RpcBlock, RpcLog, RpcReceipt, RpcTransaction};

/// Bloom filters are 256 bytes
pub const LOGS_BLOOM_BYTES: usize = 256;

fn zero_hash() -> String {
    H256::ZERO.to_hex()
}

/// Zero-filled logs bloom
pub fn empty_logs_bloom() -> String {
    format_bytes(&[0u8; LOGS_BLOOM_BYTES])
}

/// Serialise an optional DTO; `None` becomes `null`
pub fn to_json<T: Serialize>(value: Option<T>) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| RpcError::provider(e.to_string()))
}

// ==================== Blocks ====================

/// Format a block. With `full` and an expanded block, transactions are
/// formatted objects; otherwise they are ids.
pub fn format_block(block: &NativeBlock, full: bool, chain_id: u64) -> RpcBlock {
    let transactions = match (&block.transactions, full) {
        (BlockTransactions::Expanded(txs), true) => txs
            .iter()
            .enumerate()
            .map(|(index, tx)| {
                let native = expanded_transaction(tx, block);
                serde_json::to_value(format_transaction(&native, Some(index as u64), chain_id))
                    .unwrap_or(Value::Null)
            })
            .collect(),
        (txs, _) => txs
            .ids()
            .into_iter()
            .map(|id| Value::String(id.to_hex()))
            .collect(),
    };

    RpcBlock {
        hash: block.id.to_hex(),
        parent_hash: block.parent_id.to_hex(),
        sha3_uncles: zero_hash(),
        miner: block.beneficiary.to_hex(),
        state_root: block.state_root.to_hex(),
        transactions_root: block.txs_root.to_hex(),
        receipts_root: block.receipts_root.to_hex(),
        logs_bloom: empty_logs_bloom(),
        difficulty: format_u64(0),
        number: format_u64(u64::from(block.number)),
        gas_limit: format_u64(block.gas_limit),
        gas_used: format_u64(block.gas_used),
        timestamp: format_u64(block.timestamp),
        extra_data: "0x".to_string(),
        mix_hash: zero_hash(),
        nonce: format_bytes(&[0u8; 8]),
        base_fee_per_gas: format_u256(&block.base_fee_per_gas.unwrap_or_default()),
        total_difficulty: format_u64(0),
        size: format_u64(block.size),
        transactions,
        uncles: Vec::new(),
    }
}

/// Block header as pushed to `newHeads` subscribers: the block without
/// its transaction and uncle lists
pub fn format_header(block: &NativeBlock) -> Value {
    let mut value = serde_json::to_value(format_block(block, false, 0)).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.remove("transactions");
        map.remove("uncles");
    }
    value
}

// ==================== Transactions ====================

/// Split an expanded block entry into its transaction
pub fn expanded_transaction(tx: &ExpandedTransaction, block: &NativeBlock) -> NativeTransaction {
    NativeTransaction {
        id: tx.id,
        tx_type: tx.tx_type,
        chain_tag: tx.chain_tag,
        block_ref: tx.block_ref.clone(),
        expiration: tx.expiration,
        clauses: tx.clauses.clone(),
        gas_price_coef: tx.gas_price_coef,
        max_fee_per_gas: None,
        max_priority_fee_per_gas: None,
        gas: tx.gas,
        origin: tx.origin,
        delegator: tx.delegator,
        nonce: tx.nonce,
        depends_on: tx.depends_on,
        size: tx.size,
        meta: Some(TxMeta {
            block_id: block.id,
            block_number: block.number,
            block_timestamp: block.timestamp,
        }),
    }
}

/// ... and into its receipt
pub fn expanded_receipt(tx: &ExpandedTransaction, block: &NativeBlock) -> NativeReceipt {
    NativeReceipt {
        tx_type: tx.tx_type,
        gas_used: tx.gas_used,
        gas_payer: tx.gas_payer,
        paid: tx.paid,
        reward: tx.reward,
        reverted: tx.reverted,
        meta: ReceiptMeta {
            block_id: block.id,
            block_number: block.number,
            block_timestamp: block.timestamp,
            tx_id: tx.id,
            tx_origin: tx.origin,
        },
        outputs: tx.outputs.clone(),
    }
}

fn first_clause_to(tx: &NativeTransaction) -> Option<Address> {
    tx.clauses.first().and_then(|c| c.to)
}

/// Format a transaction. Value, recipient and input come from the first
/// clause; `to` is null for contract creation.
pub fn format_transaction(tx: &NativeTransaction, index: Option<u64>, chain_id: u64) -> RpcTransaction {
    let clause = tx.clauses.first();
    let dynamic_fee = tx.max_fee_per_gas.is_some();
    RpcTransaction {
        hash: tx.id.to_hex(),
        nonce: format_u256(&tx.nonce),
        block_hash: tx.meta.as_ref().map(|m| m.block_id.to_hex()),
        block_number: tx
            .meta
            .as_ref()
            .map(|m| format_u64(u64::from(m.block_number))),
        transaction_index: tx.meta.as_ref().and(index).map(format_u64),
        from: tx.origin.to_hex(),
        to: first_clause_to(tx).map(|to| to.to_hex()),
        value: format_u256(&clause.map(|c| c.value).unwrap_or_default()),
        gas: format_u64(tx.gas),
        gas_price: format_u64(0),
        input: clause
            .map(|c| c.data.to_hex())
            .unwrap_or_else(|| "0x".to_string()),
        v: format_u64(0),
        r: format_u64(0),
        s: format_u64(0),
        tx_type: format_u64(u64::from(tx.tx_type.unwrap_or(0))),
        chain_id: format_u64(chain_id),
        max_fee_per_gas: dynamic_fee
            .then(|| format_u256(&tx.max_fee_per_gas.unwrap_or_default())),
        max_priority_fee_per_gas: dynamic_fee
            .then(|| format_u256(&tx.max_priority_fee_per_gas.unwrap_or_default())),
    }
}

// ==================== Receipts and logs ====================

/// Format a receipt. Logs are numbered in emission order across clauses.
pub fn format_receipt(receipt: &NativeReceipt, tx: &NativeTransaction, index: u64) -> RpcReceipt {
    let meta = &receipt.meta;
    let mut logs = Vec::new();
    for output in &receipt.outputs {
        for event in &output.events {
            let log_meta = LogMeta {
                block_id: meta.block_id,
                block_number: meta.block_number,
                block_timestamp: meta.block_timestamp,
                tx_id: meta.tx_id,
                tx_origin: meta.tx_origin,
                clause_index: 0,
                tx_index: Some(index as u32),
                log_index: Some(logs.len() as u32),
            };
            logs.push(format_log(&NativeEventLog {
                address: event.address,
                topics: event.topics.clone(),
                data: event.data.clone(),
                meta: log_meta,
            }));
        }
    }

    let effective_gas_price = if receipt.gas_used == 0 {
        U256::zero()
    } else {
        receipt.paid / U256::from(receipt.gas_used)
    };

    RpcReceipt {
        transaction_hash: meta.tx_id.to_hex(),
        transaction_index: format_u64(index),
        block_hash: meta.block_id.to_hex(),
        block_number: format_u64(u64::from(meta.block_number)),
        from: meta.tx_origin.to_hex(),
        to: first_clause_to(tx).map(|to| to.to_hex()),
        cumulative_gas_used: format_u64(receipt.gas_used),
        gas_used: format_u64(receipt.gas_used),
        contract_address: receipt
            .outputs
            .first()
            .and_then(|o| o.contract_address)
            .map(|a| a.to_hex()),
        logs,
        logs_bloom: empty_logs_bloom(),
        tx_type: format_u64(u64::from(receipt.tx_type.unwrap_or(0))),
        status: format_u64(if receipt.reverted { 0 } else { 1 }),
        effective_gas_price: format_u256(&effective_gas_price),
    }
}

/// Format a log; missing indexes are reported as `0x0`
pub fn format_log(log: &NativeEventLog) -> RpcLog {
    RpcLog {
        address: log.address.to_hex(),
        topics: log.topics.iter().map(H256::to_hex).collect(),
        data: log.data.to_hex(),
        block_hash: log.meta.block_id.to_hex(),
        block_number: format_u64(u64::from(log.meta.block_number)),
        transaction_hash: log.meta.tx_id.to_hex(),
        transaction_index: format_u64(u64::from(log.meta.tx_index.unwrap_or(0))),
        log_index: format_u64(u64::from(log.meta.log_index.unwrap_or(0))),
        removed: false,
    }
}
