//! Ethereum namespace RPC methods (eth_*)

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Value};
use thor_primitives::{Address, H256, U256};
use thor_sdk::abi::{ParamType, Token};
use thor_sdk::contract::FunctionDef;
use thor_sdk::tx::{block_ref_from_id, intrinsic_gas};
use thor_sdk::types::{
    BlockTransactions, EventLogQuery, InspectRequest, LogOptions, LogOrder, LogRange,
    NativeBlock, NativeCallResult, NativeClause, Revision,
};
use thor_sdk::{Signer, TxBody, TxBuilder};

use crate::error::{RpcError, RpcResult};
use crate::filter::LogFilter;
use crate::formatter::{
    expanded_receipt, expanded_transaction, format_block, format_log, format_receipt,
    format_transaction, to_json,
};
use crate::handler::RpcContext;
use crate::types::{
    check_arity, format_bytes, format_u256, format_u64, optional_block_param, optional_bool,
    parse_address, parse_block_param, parse_h256, parse_hex_bytes, parse_u256, parse_u64,
    require_param, BlockParam, TransactionRequest,
};

/// Built-in contract holding governance parameters
pub const PARAMS_ADDRESS: Address = Address::from_bytes([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x50, 0x61, 0x72, 0x61, 0x6d, 0x73,
]);

/// Parameter key of the base gas price
pub const BASE_GAS_PRICE_KEY: &[u8] = b"base-gas-price";

/// Seconds between blocks
pub const BLOCK_INTERVAL_SECS: u64 = 10;

/// Best block older than this many intervals counts as syncing
const SYNC_LAG_BLOCKS: u64 = 11;

fn params_get() -> FunctionDef {
    FunctionDef::new("get", vec![ParamType::FixedBytes(32)], vec![ParamType::Uint(256)])
}

/// Right-padded bytes32 parameter key
fn params_key(key: &[u8]) -> H256 {
    let mut word = [0u8; 32];
    let len = key.len().min(32);
    word[..len].copy_from_slice(&key[..len]);
    H256::from_bytes(word)
}

/// Storage slot given as a quantity or a 32-byte word
fn parse_storage_key(value: &Value) -> RpcResult<H256> {
    let slot = parse_u256(value)?;
    let mut word = [0u8; 32];
    slot.to_big_endian(&mut word);
    Ok(H256::from_bytes(word))
}

fn clause_of(request: &TransactionRequest) -> NativeClause {
    NativeClause {
        to: request.to,
        value: request.value,
        data: request.data.clone().into(),
    }
}

async fn inspect(
    ctx: &RpcContext,
    request: &TransactionRequest,
    revision: Revision,
) -> RpcResult<NativeCallResult> {
    let inspect = InspectRequest {
        clauses: vec![clause_of(request)],
        caller: request.from,
        gas: request.gas,
        gas_payer: None,
    };
    ctx.client
        .inspect_clauses(&inspect, revision)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| RpcError::provider("node returned no clause result"))
}

fn reverted(result: &NativeCallResult) -> RpcError {
    RpcError::provider_with_data(
        format!("execution reverted: {}", result.vm_error),
        json!({ "vmError": result.vm_error, "data": result.data.to_hex() }),
    )
}

async fn get_block(ctx: &RpcContext, param: BlockParam, expanded: bool) -> RpcResult<Option<NativeBlock>> {
    Ok(ctx.client.get_block(param.revision(), expanded).await?)
}

/// Height a block reference points at; unknown blocks are a provider error
async fn block_number_of(ctx: &RpcContext, param: BlockParam) -> RpcResult<u64> {
    match param {
        BlockParam::Number(n) => Ok(u64::from(n)),
        BlockParam::Earliest => Ok(0),
        other => get_block(ctx, other, false)
            .await?
            .map(|block| u64::from(block.number))
            .ok_or_else(|| RpcError::provider(format!("block {:?} not found", other))),
    }
}

/// Position of transaction `id` within block `block_id`
async fn transaction_index(ctx: &RpcContext, block_id: &H256, id: &H256) -> RpcResult<Option<u64>> {
    let block = ctx.client.get_block(Revision::Id(*block_id), false).await?;
    Ok(block
        .and_then(|b| b.transactions.index_of(id))
        .map(|i| i as u64))
}

// ==================== Chain and node status ====================

/// eth_chainId - Returns the chain ID
pub async fn eth_chain_id(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    Ok(Value::String(format_u64(ctx.chain_id().await?)))
}

/// eth_blockNumber - Returns the current block number
pub async fn eth_block_number(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let best = ctx.client.best_block().await?;
    Ok(Value::String(format_u64(u64::from(best.number))))
}

/// eth_syncing - `false` when the best block is recent, else progress
/// estimated from the block interval
pub async fn eth_syncing(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let best = ctx.client.best_block().await?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let lag = now.saturating_sub(best.timestamp);
    if lag < SYNC_LAG_BLOCKS * BLOCK_INTERVAL_SECS {
        return Ok(Value::Bool(false));
    }
    let current = u64::from(best.number);
    Ok(json!({
        "startingBlock": format_u64(0),
        "currentBlock": format_u64(current),
        "highestBlock": format_u64(current + lag / BLOCK_INTERVAL_SECS),
    }))
}

/// eth_gasPrice - Base gas price from the params contract, scaled by the
/// configured coefficient
pub async fn eth_gas_price(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let get = params_get();
    let data = get.encode_input(&[Token::bytes32(params_key(BASE_GAS_PRICE_KEY))])?;
    let request = TransactionRequest {
        to: Some(PARAMS_ADDRESS),
        data,
        ..Default::default()
    };
    let result = inspect(&ctx, &request, Revision::Best).await?;
    if result.reverted {
        return Err(reverted(&result));
    }
    let base = get
        .decode_output(result.data.as_slice())?
        .first()
        .and_then(Token::as_uint)
        .ok_or_else(|| RpcError::provider("unexpected base gas price output"))?;
    let coef = U256::from(ctx.config.gas_price_coef);
    let price = base + base * coef / U256::from(255u64);
    Ok(Value::String(format_u256(&price)))
}

// ==================== Accounts and state ====================

/// eth_accounts - Wallet addresses in wallet order; empty without a wallet
pub async fn eth_accounts(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let accounts: Vec<Value> = ctx
        .accounts()
        .iter()
        .map(|a| Value::String(a.to_hex()))
        .collect();
    Ok(Value::Array(accounts))
}

/// eth_requestAccounts - Wallet addresses; fails without any
pub async fn eth_request_accounts(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 0)?;
    let accounts: Vec<Value> = ctx
        .require_accounts()?
        .iter()
        .map(|a| Value::String(a.to_hex()))
        .collect();
    Ok(Value::Array(accounts))
}

/// eth_getBalance - Returns the balance of an account
pub async fn eth_get_balance(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let address = parse_address(require_param(&params, 0, "address")?)?;
    let block = optional_block_param(&params, 1)?;
    let account = ctx.client.get_account(&address, block.revision()).await?;
    Ok(Value::String(format_u256(&account.balance)))
}

/// eth_getCode - Returns the code at an address
pub async fn eth_get_code(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let address = parse_address(require_param(&params, 0, "address")?)?;
    let block = optional_block_param(&params, 1)?;
    let code = ctx.client.get_code(&address, block.revision()).await?;
    Ok(Value::String(code.to_hex()))
}

/// eth_getStorageAt - Returns storage value at a position
pub async fn eth_get_storage_at(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 3)?;
    let address = parse_address(require_param(&params, 0, "address")?)?;
    let key = parse_storage_key(require_param(&params, 1, "position")?)?;
    let block = optional_block_param(&params, 2)?;
    let value = ctx.client.get_storage(&address, &key, block.revision()).await?;
    Ok(Value::String(value.to_hex()))
}

/// eth_getTransactionCount - Always zero: native nonces are not sequential
pub async fn eth_get_transaction_count(_ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    parse_address(require_param(&params, 0, "address")?)?;
    optional_block_param(&params, 1)?;
    Ok(Value::String(format_u64(0)))
}

// ==================== Execution ====================

/// eth_call - Executes a call without creating a transaction
pub async fn eth_call(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let request = TransactionRequest::from_value(require_param(&params, 0, "transaction")?)?;
    let block = optional_block_param(&params, 1)?;

    let result = inspect(&ctx, &request, block.revision()).await?;
    if result.reverted {
        return Err(reverted(&result));
    }
    Ok(Value::String(result.data.to_hex()))
}

async fn estimate(ctx: &RpcContext, request: &TransactionRequest, revision: Revision) -> RpcResult<u64> {
    let result = inspect(ctx, request, revision).await?;
    if result.reverted {
        return Err(reverted(&result));
    }
    Ok(result.gas_used + intrinsic_gas(&[clause_of(request)]))
}

/// eth_estimateGas - Gas used by a simulated execution plus intrinsic gas
pub async fn eth_estimate_gas(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let request = TransactionRequest::from_value(require_param(&params, 0, "transaction")?)?;
    let block = optional_block_param(&params, 1)?;
    let gas = estimate(&ctx, &request, block.revision()).await?;
    Ok(Value::String(format_u64(gas)))
}

/// eth_sendRawTransaction - Submits a raw transaction
pub async fn eth_send_raw_transaction(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let raw = parse_hex_bytes(require_param(&params, 0, "data")?)?;
    if raw.is_empty() {
        return Err(RpcError::invalid_params("empty transaction"));
    }
    let id = ctx.client.send_raw_transaction(&raw).await?;
    Ok(Value::String(id.to_hex()))
}

/// Native body for a transaction object: chain tag from genesis, reference
/// block from the best block, gas estimated when not given
async fn build_transaction(ctx: &RpcContext, request: &TransactionRequest) -> RpcResult<TxBody> {
    let chain_tag = ctx.client.chain_tag().await?;
    let best = ctx.client.best_block().await?;
    let gas = match request.gas {
        Some(gas) => gas,
        None => estimate(ctx, request, Revision::Best).await?,
    };

    let mut builder = TxBuilder::new(chain_tag)
        .block_ref(block_ref_from_id(&best.id))
        .expiration(ctx.config.tx_expiration)
        .gas_price_coef(ctx.config.gas_price_coef)
        .clause(request.to, request.value, request.data.clone())
        .gas(gas);
    if let Some(nonce) = request.nonce {
        builder = builder.nonce(nonce);
    }
    builder
        .build()
        .map_err(|e| RpcError::invalid_params(e.to_string()))
}

/// Parse the transaction object and resolve its signer, before any
/// native call
fn signing_request(
    ctx: &RpcContext,
    params: &[Value],
) -> RpcResult<(TransactionRequest, Arc<dyn Signer>)> {
    check_arity(params, 1)?;
    let request = TransactionRequest::from_value(require_param(params, 0, "transaction")?)?;
    let from = request
        .from
        .ok_or_else(|| RpcError::invalid_params("missing from address"))?;
    let signer = ctx.signer(&from)?;
    Ok((request, signer))
}

/// eth_sendTransaction - Builds, signs with the wallet and submits
pub async fn eth_send_transaction(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    let (request, signer) = signing_request(&ctx, &params)?;
    let body = build_transaction(&ctx, &request).await?;
    let raw = signer.sign_transaction(&body)?;
    let id = ctx.client.send_raw_transaction(&raw).await?;
    tracing::info!(id = %id, from = %signer.address(), "transaction sent");
    Ok(Value::String(id.to_hex()))
}

/// eth_signTransaction - Builds and signs; returns the raw transaction
pub async fn eth_sign_transaction(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    let (request, signer) = signing_request(&ctx, &params)?;
    let body = build_transaction(&ctx, &request).await?;
    let raw = signer.sign_transaction(&body)?;
    Ok(Value::String(format_bytes(&raw)))
}

// ==================== Blocks ====================

async fn block_response(ctx: &RpcContext, param: BlockParam, full: bool) -> RpcResult<Value> {
    let Some(block) = get_block(ctx, param, full).await? else {
        return Ok(Value::Null);
    };
    let chain_id = if full { ctx.chain_id().await? } else { 0 };
    to_json(Some(format_block(&block, full, chain_id)))
}

/// eth_getBlockByNumber - Returns block by number or tag
pub async fn eth_get_block_by_number(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let block = parse_block_param(require_param(&params, 0, "block")?)?;
    let full = optional_bool(&params, 1, "full transactions flag")?;
    block_response(&ctx, block, full).await
}

/// eth_getBlockByHash - Returns block by hash
pub async fn eth_get_block_by_hash(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let hash = parse_h256(require_param(&params, 0, "block hash")?)?;
    let full = optional_bool(&params, 1, "full transactions flag")?;
    block_response(&ctx, BlockParam::Hash(hash), full).await
}

async fn transaction_count(ctx: &RpcContext, param: BlockParam) -> RpcResult<Value> {
    Ok(match get_block(ctx, param, false).await? {
        Some(block) => Value::String(format_u64(block.transactions.len() as u64)),
        None => Value::Null,
    })
}

/// eth_getBlockTransactionCountByNumber
pub async fn eth_get_block_transaction_count_by_number(
    ctx: Arc<RpcContext>,
    params: Vec<Value>,
) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let block = parse_block_param(require_param(&params, 0, "block")?)?;
    transaction_count(&ctx, block).await
}

/// eth_getBlockTransactionCountByHash
pub async fn eth_get_block_transaction_count_by_hash(
    ctx: Arc<RpcContext>,
    params: Vec<Value>,
) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let hash = parse_h256(require_param(&params, 0, "block hash")?)?;
    transaction_count(&ctx, BlockParam::Hash(hash)).await
}

/// eth_getBlockReceipts - Receipts of every transaction in a block
pub async fn eth_get_block_receipts(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let param = parse_block_param(require_param(&params, 0, "block")?)?;
    let Some(block) = get_block(&ctx, param, true).await? else {
        return Ok(Value::Null);
    };

    let mut receipts = Vec::with_capacity(block.transactions.len());
    match &block.transactions {
        BlockTransactions::Expanded(txs) => {
            for (index, tx) in txs.iter().enumerate() {
                let receipt = expanded_receipt(tx, &block);
                let tx = expanded_transaction(tx, &block);
                receipts.push(format_receipt(&receipt, &tx, index as u64));
            }
        }
        BlockTransactions::Ids(ids) => {
            for (index, id) in ids.iter().enumerate() {
                let receipt = ctx
                    .client
                    .get_receipt(id)
                    .await?
                    .ok_or_else(|| missing_in_block("receipt", id, &block.id))?;
                let tx = ctx
                    .client
                    .get_transaction(id)
                    .await?
                    .ok_or_else(|| missing_in_block("transaction", id, &block.id))?;
                receipts.push(format_receipt(&receipt, &tx, index as u64));
            }
        }
    }
    to_json(Some(receipts))
}

// ==================== Transactions and receipts ====================

/// The node listed `id` in a block but cannot serve it
fn missing_in_block(what: &str, id: &H256, block_id: &H256) -> RpcError {
    RpcError::provider(format!("{} {} not found in block {}", what, id, block_id))
}

/// eth_getTransactionByHash - Returns transaction by hash
pub async fn eth_get_transaction_by_hash(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let hash = parse_h256(require_param(&params, 0, "transaction hash")?)?;
    let Some(tx) = ctx.client.get_transaction(&hash).await? else {
        return Ok(Value::Null);
    };
    let index = match &tx.meta {
        Some(meta) => transaction_index(&ctx, &meta.block_id, &tx.id).await?,
        None => None,
    };
    let chain_id = ctx.chain_id().await?;
    to_json(Some(format_transaction(&tx, index, chain_id)))
}

async fn transaction_by_block_and_index(
    ctx: &RpcContext,
    param: BlockParam,
    index: &Value,
) -> RpcResult<Value> {
    let index = parse_u64(index)?;
    let Some(block) = get_block(ctx, param, false).await? else {
        return Ok(Value::Null);
    };
    let Some(id) = block.transactions.ids().get(index as usize).copied() else {
        return Ok(Value::Null);
    };
    let Some(tx) = ctx.client.get_transaction(&id).await? else {
        return Ok(Value::Null);
    };
    let chain_id = ctx.chain_id().await?;
    to_json(Some(format_transaction(&tx, Some(index), chain_id)))
}

/// eth_getTransactionByBlockNumberAndIndex
pub async fn eth_get_transaction_by_block_number_and_index(
    ctx: Arc<RpcContext>,
    params: Vec<Value>,
) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let block = parse_block_param(require_param(&params, 0, "block")?)?;
    transaction_by_block_and_index(&ctx, block, require_param(&params, 1, "index")?).await
}

/// eth_getTransactionByBlockHashAndIndex
pub async fn eth_get_transaction_by_block_hash_and_index(
    ctx: Arc<RpcContext>,
    params: Vec<Value>,
) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let hash = parse_h256(require_param(&params, 0, "block hash")?)?;
    transaction_by_block_and_index(&ctx, BlockParam::Hash(hash), require_param(&params, 1, "index")?)
        .await
}

/// eth_getTransactionReceipt - Returns transaction receipt
pub async fn eth_get_transaction_receipt(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let hash = parse_h256(require_param(&params, 0, "transaction hash")?)?;
    let Some(receipt) = ctx.client.get_receipt(&hash).await? else {
        return Ok(Value::Null);
    };
    let Some(tx) = ctx.client.get_transaction(&hash).await? else {
        return Ok(Value::Null);
    };
    let index = transaction_index(&ctx, &receipt.meta.block_id, &hash)
        .await?
        .ok_or_else(|| missing_in_block("transaction", &hash, &receipt.meta.block_id))?;
    to_json(Some(format_receipt(&receipt, &tx, index)))
}

// ==================== Logs ====================

/// eth_getLogs - Logs matching a filter, oldest first
pub async fn eth_get_logs(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let filter = LogFilter::from_value(require_param(&params, 0, "filter")?)?;

    let (from, to) = match filter.block_hash {
        Some(hash) => {
            let number = block_number_of(&ctx, BlockParam::Hash(hash)).await?;
            (number, number)
        }
        None => {
            let from = block_number_of(&ctx, filter.from_block.unwrap_or_default()).await?;
            let to = block_number_of(&ctx, filter.to_block.unwrap_or_default()).await?;
            (from, to)
        }
    };
    if from > to {
        return Err(RpcError::invalid_params(format!(
            "fromBlock {} is after toBlock {}",
            from, to
        )));
    }

    let query = EventLogQuery {
        range: Some(LogRange::blocks(from, to)),
        options: Some(LogOptions {
            offset: 0,
            limit: ctx.config.logs_limit,
            include_indexes: true,
        }),
        criteria_set: filter.criteria_set(),
        order: LogOrder::Asc,
    };
    let logs = ctx.client.filter_raw_event_logs(&query).await?;
    to_json(Some(logs.iter().map(format_log).collect::<Vec<_>>()))
}

/// eth_subscribe - Starts a `newHeads` or `logs` subscription
pub async fn eth_subscribe(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let kind = require_param(&params, 0, "subscription type")?
        .as_str()
        .ok_or_else(|| RpcError::invalid_params("subscription type must be a string"))?;
    let id = ctx.subscriptions.subscribe(kind, params.get(1)).await?;
    Ok(Value::String(id))
}

/// eth_unsubscribe - Stops a subscription; `false` for unknown ids
pub async fn eth_unsubscribe(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 1)?;
    let id = require_param(&params, 0, "subscription id")?
        .as_str()
        .ok_or_else(|| RpcError::invalid_params("subscription id must be a string"))?;
    Ok(Value::Bool(ctx.subscriptions.unsubscribe(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_address() {
        assert_eq!(
            PARAMS_ADDRESS.to_hex(),
            "0x0000000000000000000000000000506172616d73"
        );
    }

    #[test]
    fn test_params_key_is_right_padded() {
        let key = params_key(BASE_GAS_PRICE_KEY);
        assert_eq!(&key.as_bytes()[..14], b"base-gas-price");
        assert!(key.as_bytes()[14..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_params_get_selector() {
        assert_eq!(params_get().signature(), "get(bytes32)");
        assert_eq!(params_get().selector(), [0x8e, 0xaa, 0x6a, 0xc0]);
    }

    #[test]
    fn test_storage_key_forms() {
        let short = parse_storage_key(&Value::String("0x1".into())).unwrap();
        assert_eq!(short, H256::from_low_u64_be(1));
        let word = H256::from_low_u64_be(0xabcd);
        assert_eq!(parse_storage_key(&Value::String(word.to_hex())).unwrap(), word);
        assert!(parse_storage_key(&Value::Bool(true)).is_err());
    }

    #[test]
    fn test_reverted_carries_vm_error() {
        let result = NativeCallResult {
            reverted: true,
            vm_error: "execution reverted".into(),
            data: vec![0x08, 0xc3, 0x79, 0xa0].into(),
            ..Default::default()
        };
        match reverted(&result) {
            RpcError::Provider { data: Some(data), .. } => {
                assert_eq!(data["vmError"], "execution reverted");
                assert_eq!(data["data"], "0x08c379a0");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }
}
