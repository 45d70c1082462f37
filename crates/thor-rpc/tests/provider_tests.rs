//! Provider integration tests for thor-rpc
//!
//! Drives the provider end to end against an in-memory node and WebSocket
//! connector: block lookups, wallet policy, transaction submission, log
//! queries and subscription lifecycles.

use proptest::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thor_rpc::error::error_code;
use thor_rpc::handler::{MAINNET_GENESIS_ID, TESTNET_GENESIS_ID};
use thor_rpc::types::format_u256;
use thor_rpc::{Provider, ProviderConfig, RpcContext, RpcError};
use thor_sdk::types::{HexBytes, LogMeta, NativeEventLog};
use thor_sdk::ws::MockWsConnector;
use thor_sdk::{Address, HttpMethod, LocalWallet, MockNodeClient, ThorClient, Wallet, H256, U256};
use tokio::sync::broadcast;

const KEY_A: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
const KEY_B: &str = "0x8da4ef21b864d2cc526dbdb2a120bd2874c36c9d0a1fb7f8c63d7f7a8b41de8f";

struct Harness {
    node: MockNodeClient,
    ws: MockWsConnector,
    provider: Provider,
}

fn harness_with(wallet: Option<LocalWallet>) -> Harness {
    let node = MockNodeClient::new();
    let ws = MockWsConnector::new();
    let mut ctx = RpcContext::with_connector(
        ThorClient::new(Arc::new(node.clone())),
        ProviderConfig::default(),
        Arc::new(ws.clone()),
    );
    if let Some(wallet) = wallet {
        ctx = ctx.with_wallet(Arc::new(wallet));
    }
    Harness {
        node,
        ws,
        provider: Provider::new(ctx),
    }
}

fn harness() -> Harness {
    harness_with(None)
}

fn block_json(number: u32, id: H256) -> Value {
    json!({
        "number": number,
        "id": id,
        "size": 170,
        "parentID": H256::ZERO,
        "timestamp": 1_530_316_800u64 + u64::from(number) * 10,
        "gasLimit": 10_000_000,
        "beneficiary": Address::ZERO,
        "gasUsed": 0,
        "totalScore": number,
        "txsRoot": H256::ZERO,
        "txsFeatures": 0,
        "stateRoot": H256::ZERO,
        "receiptsRoot": H256::ZERO,
        "signer": Address::ZERO,
        "isTrunk": true,
        "transactions": []
    })
}

fn serve_genesis(node: &MockNodeClient, genesis_id: &str) {
    let id = H256::from_hex(genesis_id).unwrap();
    node.set_response(HttpMethod::Get, "/blocks/0", block_json(0, id));
}

fn event_log(block: u32, index: u32, address: Address, topic0: H256) -> NativeEventLog {
    NativeEventLog {
        address,
        topics: vec![topic0],
        data: HexBytes(vec![0u8; 32]),
        meta: LogMeta {
            block_id: H256::from_low_u64_be(u64::from(block) + 1),
            block_number: block,
            block_timestamp: 1_000 + u64::from(block) * 10,
            tx_id: H256::from_low_u64_be(u64::from(block) * 100 + u64::from(index)),
            tx_origin: Address::from_bytes([0x11; 20]),
            clause_index: 0,
            tx_index: Some(0),
            log_index: Some(index),
        },
    }
}

async fn next_frame(rx: &mut broadcast::Receiver<Value>) -> Value {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed")
}

// ===== Block Lookup Tests =====

#[tokio::test]
async fn test_genesis_block_by_number() {
    let h = harness();
    serve_genesis(&h.node, MAINNET_GENESIS_ID);

    let block = h
        .provider
        .request("eth_getBlockByNumber", vec![json!(0), json!(false)])
        .await
        .unwrap();
    assert_eq!(block["number"], "0x0");
    assert_eq!(block["hash"], MAINNET_GENESIS_ID);
    assert_eq!(block["transactions"], json!([]));
    assert_eq!(block["uncles"], json!([]));
}

#[tokio::test]
async fn test_unknown_block_is_null() {
    let h = harness();
    h.node
        .set_response(HttpMethod::Get, &format!("/blocks/{}", H256::ZERO), Value::Null);

    let block = h
        .provider
        .request(
            "eth_getBlockByNumber",
            vec![json!(format!("0x{}", "0".repeat(64))), json!(false)],
        )
        .await
        .unwrap();
    assert_eq!(block, Value::Null);
}

#[tokio::test]
async fn test_negative_block_number_is_provider_error() {
    let h = harness();
    let err = h
        .provider
        .request("eth_getBlockByNumber", vec![json!(-1)])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Provider { .. }));
    assert_eq!(err.code(), error_code::INTERNAL_ERROR);
    assert!(h.node.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_block_param_is_invalid_params() {
    let h = harness();
    let err = h
        .provider
        .request("eth_getBlockByNumber", vec![json!({ "number": 1 })])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::InvalidParams(_)));
    assert!(h.node.calls().is_empty());
}

#[tokio::test]
async fn test_native_failure_wrapped_as_provider_error() {
    let h = harness();
    h.node
        .set_error(HttpMethod::Get, "/blocks/best", 500, "database closed");
    let err = h.provider.request("eth_blockNumber", vec![]).await.unwrap_err();
    match err {
        RpcError::Provider { data: Some(data), .. } => {
            assert_eq!(data["status"], 500);
            assert_eq!(data["message"], "database closed");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

// ===== Receipt Tests =====

fn receipt_json(tx_id: H256, block_id: H256) -> Value {
    json!({
        "gasUsed": 21000,
        "gasPayer": Address::ZERO,
        "paid": "0x0",
        "reward": "0x0",
        "reverted": false,
        "meta": {
            "blockID": block_id,
            "blockNumber": 1,
            "blockTimestamp": 1_530_316_810u64,
            "txID": tx_id,
            "txOrigin": Address::ZERO
        },
        "outputs": []
    })
}

#[tokio::test]
async fn test_receipt_outside_its_block_is_provider_error() {
    let h = harness();
    let tx_id = H256::from_low_u64_be(0xaa);
    let block_id = H256::from_low_u64_be(0xbb);
    h.node.set_response(
        HttpMethod::Get,
        &format!("/transactions/{}/receipt", tx_id),
        receipt_json(tx_id, block_id),
    );
    h.node.set_response(
        HttpMethod::Get,
        &format!("/transactions/{}", tx_id),
        json!({ "id": tx_id }),
    );
    // block listing no transactions at all
    h.node
        .set_response(HttpMethod::Get, &format!("/blocks/{}", block_id), block_json(1, block_id));

    let err = h
        .provider
        .request("eth_getTransactionReceipt", vec![json!(tx_id.to_hex())])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Provider { .. }));
    assert!(err.to_string().contains("not found in block"));
}

#[tokio::test]
async fn test_block_receipts_missing_receipt_is_provider_error() {
    let h = harness();
    let block_id = H256::from_low_u64_be(0xbb);
    let listed = H256::from_low_u64_be(0xaa);
    let mut block = block_json(1, block_id);
    block["transactions"] = json!([listed]);
    h.node.set_response(HttpMethod::Get, "/blocks/1", block);
    h.node.set_response(
        HttpMethod::Get,
        &format!("/transactions/{}/receipt", listed),
        Value::Null,
    );
    h.node.set_response(
        HttpMethod::Get,
        &format!("/transactions/{}", listed),
        json!({ "id": listed }),
    );

    let err = h
        .provider
        .request("eth_getBlockReceipts", vec![json!("0x1")])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Provider { .. }));
    assert!(err.to_string().contains("receipt"));
}

#[tokio::test]
async fn test_block_receipts_of_empty_block() {
    let h = harness();
    h.node
        .set_response(HttpMethod::Get, "/blocks/1", block_json(1, H256::from_low_u64_be(0xbb)));

    let receipts = h
        .provider
        .request("eth_getBlockReceipts", vec![json!("0x1")])
        .await
        .unwrap();
    assert_eq!(receipts, json!([]));
}

// ===== Chain Id Tests =====

#[tokio::test]
async fn test_chain_id_by_network() {
    let h = harness();
    serve_genesis(&h.node, TESTNET_GENESIS_ID);
    assert_eq!(
        h.provider.request("eth_chainId", vec![]).await.unwrap(),
        json!("0x186aa")
    );
    assert_eq!(
        h.provider.request("net_version", vec![]).await.unwrap(),
        json!("100010")
    );
    assert_eq!(h.node.calls_to("/blocks/0").len(), 1);
}

#[tokio::test]
async fn test_chain_id_rejects_params() {
    let h = harness();
    let err = h
        .provider
        .request("eth_chainId", vec![json!("extra")])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::InvalidParams(_)));
}

// ===== Wallet Tests =====

#[tokio::test]
async fn test_accounts_follow_wallet_order() {
    let wallet = LocalWallet::from_private_keys(&[KEY_B, KEY_A]).unwrap();
    let expected: Vec<Value> = wallet
        .accounts()
        .iter()
        .map(|a| json!(a.to_hex()))
        .collect();
    let h = harness_with(Some(wallet));

    let first = h.provider.request("eth_accounts", vec![]).await.unwrap();
    let second = h.provider.request("eth_accounts", vec![]).await.unwrap();
    assert_eq!(first, Value::Array(expected));
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_accounts_without_wallet() {
    let h = harness();
    assert_eq!(
        h.provider.request("eth_accounts", vec![]).await.unwrap(),
        json!([])
    );
    let err = h
        .provider
        .request("eth_requestAccounts", vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::MissingSigner(_)));
    assert_eq!(err.code(), error_code::UNAUTHORIZED);
}

#[tokio::test]
async fn test_send_transaction_unknown_sender() {
    let h = harness_with(Some(LocalWallet::from_private_keys(&[KEY_A]).unwrap()));
    let err = h
        .provider
        .request(
            "eth_sendTransaction",
            vec![json!({ "from": Address::from_bytes([9; 20]).to_hex(), "to": Address::ZERO.to_hex() })],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::MissingSigner(_)));
    assert!(h.node.calls().is_empty());
}

#[tokio::test]
async fn test_send_transaction_malformed() {
    let h = harness_with(Some(LocalWallet::from_private_keys(&[KEY_A]).unwrap()));
    for params in [
        vec![json!("0xdeadbeef")],
        vec![json!({ "to": "not an address" })],
        vec![json!({ "to": Address::ZERO.to_hex() })],
    ] {
        let err = h
            .provider
            .request("eth_sendTransaction", params)
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidParams(_)), "{:?}", err);
    }
    assert!(h.node.calls().is_empty());
}

#[tokio::test]
async fn test_send_transaction_signs_and_submits() {
    let wallet = LocalWallet::from_private_keys(&[KEY_A]).unwrap();
    let from = wallet.accounts()[0];
    let h = harness_with(Some(wallet));
    serve_genesis(&h.node, MAINNET_GENESIS_ID);
    h.node.set_response(
        HttpMethod::Get,
        "/blocks/best",
        block_json(100, H256::from_low_u64_be(0x64)),
    );
    let tx_id = H256::from_low_u64_be(0xabc);
    h.node
        .set_response(HttpMethod::Post, "/transactions", json!({ "id": tx_id }));

    let result = h
        .provider
        .request(
            "eth_sendTransaction",
            vec![json!({
                "from": from.to_hex(),
                "to": Address::from_bytes([0x22; 20]).to_hex(),
                "value": format_u256(&U256::from(1_000u64)),
                "gas": "0x5208"
            })],
        )
        .await
        .unwrap();
    assert_eq!(result, json!(tx_id.to_hex()));

    let sent = h.node.calls_to("/transactions");
    assert_eq!(sent.len(), 1);
    let raw = sent[0].body.as_ref().unwrap()["raw"].as_str().unwrap().to_string();
    assert!(raw.starts_with("0x"));
    assert!(raw.len() > 2 + 65 * 2);
    assert!(h.node.calls_to("/accounts/*").is_empty());
}

// ===== Log Tests =====

#[tokio::test]
async fn test_get_logs_filters_and_orders() {
    let h = harness();
    let token = Address::from_bytes([0x70; 20]);
    let other = Address::from_bytes([0x71; 20]);
    let transfer = H256::from_low_u64_be(0x7777);
    h.node.serve_event_logs(vec![
        event_log(5, 1, token, transfer),
        event_log(3, 0, token, transfer),
        event_log(4, 0, other, transfer),
        event_log(9, 0, token, transfer),
    ]);

    let logs = h
        .provider
        .request(
            "eth_getLogs",
            vec![json!({
                "address": token.to_hex(),
                "fromBlock": "0x1",
                "toBlock": "0x8",
                "topics": [transfer.to_hex()]
            })],
        )
        .await
        .unwrap();
    let logs = logs.as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["blockNumber"], "0x3");
    assert_eq!(logs[1]["blockNumber"], "0x5");
    assert_eq!(logs[1]["logIndex"], "0x1");
    assert_eq!(logs[0]["removed"], false);

    let query = h.node.calls_to("/logs/event")[0].body.clone().unwrap();
    assert_eq!(query["range"]["from"], 1);
    assert_eq!(query["range"]["to"], 8);
    assert_eq!(query["order"], "asc");
}

#[tokio::test]
async fn test_get_logs_inverted_range() {
    let h = harness();
    let err = h
        .provider
        .request("eth_getLogs", vec![json!({ "fromBlock": "0x9", "toBlock": "0x2" })])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::InvalidParams(_)));
    assert!(h.node.calls().is_empty());
}

// ===== Subscription Tests =====

#[tokio::test]
async fn test_subscriptions_are_independent() {
    let h = harness();
    let mut rx = h.provider.notifications();
    let token = Address::from_bytes([0x70; 20]);

    let logs_id = h
        .provider
        .request("eth_subscribe", vec![json!("logs"), json!({ "address": token.to_hex() })])
        .await
        .unwrap();
    let heads_id = h
        .provider
        .request("eth_subscribe", vec![json!("newHeads")])
        .await
        .unwrap();
    assert_ne!(logs_id, heads_id);

    let event_url = h
        .ws
        .connected()
        .into_iter()
        .find(|url| url.contains("/subscriptions/event"))
        .unwrap();
    let block_url = "ws://localhost:8669/subscriptions/block";

    let log = serde_json::to_value(event_log(12, 0, token, H256::from_low_u64_be(1))).unwrap();
    assert!(h.ws.push_json(&event_url, &log));
    let frame = next_frame(&mut rx).await;
    assert_eq!(frame["params"]["subscription"], logs_id);
    assert_eq!(frame["params"]["result"]["address"], token.to_hex());

    let closed = h
        .provider
        .request("eth_unsubscribe", vec![logs_id.clone()])
        .await
        .unwrap();
    assert_eq!(closed, json!(true));

    assert!(h.ws.push_json(block_url, &block_json(13, H256::from_low_u64_be(13))));
    let frame = next_frame(&mut rx).await;
    assert_eq!(frame["method"], "eth_subscription");
    assert_eq!(frame["params"]["subscription"], heads_id);
    assert_eq!(frame["params"]["result"]["number"], "0xd");

    let again = h
        .provider
        .request("eth_unsubscribe", vec![logs_id])
        .await
        .unwrap();
    assert_eq!(again, json!(false));
}

#[tokio::test]
async fn test_subscribe_unknown_type() {
    let h = harness();
    let err = h
        .provider
        .request("eth_subscribe", vec![json!("newPendingTransactions")])
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::InvalidParams(_)));
    assert!(h.ws.connected().is_empty());
}

// ===== Unsupported Method Tests =====

#[tokio::test]
async fn test_unsupported_methods_report_not_implemented() {
    let h = harness();
    for method in ["eth_hashrate", "eth_newFilter", "engine_newPayloadV1", "txpool_status"] {
        let err = h.provider.request(method, vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::NotImplemented(_)), "{}", method);
        assert_eq!(err.code(), 4200);
    }
    let err = h.provider.request("eth_doesNotExist", vec![]).await.unwrap_err();
    assert!(matches!(err, RpcError::MethodNotFound(_)));
    assert!(h.node.calls().is_empty());
}

// ===== Quantity Formatting Tests =====

proptest! {
    #[test]
    fn prop_quantities_have_no_leading_zeros(value in any::<u128>()) {
        let formatted = format_u256(&U256::from(value));
        let digits = formatted.strip_prefix("0x").unwrap();
        prop_assert!(digits == "0" || !digits.starts_with('0'));
        prop_assert!(digits.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        prop_assert_eq!(u128::from_str_radix(digits, 16).unwrap(), value);
    }
}
