//! ThorClient - typed access to the node REST API

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thor_primitives::{Address, H256};

use crate::client::{deserialize_response, HttpMethod, NodeClient};
use crate::types::{
    EventLogQuery, HexBytes, InspectRequest, NativeAccount, NativeBlock, NativeCallResult,
    NativeEventLog, NativeReceipt, NativeTransaction, Revision,
};
use crate::SdkError;

/// Typed façade over a [`NodeClient`]. Cheap to clone.
#[derive(Clone)]
pub struct ThorClient {
    node: Arc<dyn NodeClient>,
}

impl ThorClient {
    /// Wrap a node transport
    pub fn new(node: Arc<dyn NodeClient>) -> Self {
        Self { node }
    }

    /// Connect over HTTP
    #[cfg(feature = "http")]
    pub fn connect(base_url: &str, timeout: std::time::Duration) -> Result<Self, SdkError> {
        let node = crate::client::HttpNodeClient::new(base_url, timeout)?;
        Ok(Self::new(Arc::new(node)))
    }

    /// Underlying transport
    pub fn node(&self) -> &Arc<dyn NodeClient> {
        &self.node
    }

    /// GET that maps a `null` body to `None`
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, SdkError> {
        let value = self.node.call(HttpMethod::Get, path, None).await?;
        if value.is_null() {
            return Ok(None);
        }
        deserialize_response(value).map(Some)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SdkError> {
        self.get_optional(path)
            .await?
            .ok_or_else(|| SdkError::MissingField(format!("empty response from {}", path)))
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T, SdkError> {
        let body = serde_json::to_value(body)?;
        let value = self.node.call(HttpMethod::Post, path, Some(body)).await?;
        deserialize_response(value)
    }

    // ==================== Blocks ====================

    /// Fetch a block; `None` if the node has no such block
    pub async fn get_block(
        &self,
        revision: Revision,
        expanded: bool,
    ) -> Result<Option<NativeBlock>, SdkError> {
        self.get_optional(&format!("/blocks/{}?expanded={}", revision, expanded))
            .await
    }

    /// Head of the canonical chain
    pub async fn best_block(&self) -> Result<NativeBlock, SdkError> {
        self.get("/blocks/best?expanded=false").await
    }

    /// Block 0
    pub async fn genesis_block(&self) -> Result<NativeBlock, SdkError> {
        self.get("/blocks/0?expanded=false").await
    }

    /// Chain tag: last byte of the genesis block id
    pub async fn chain_tag(&self) -> Result<u8, SdkError> {
        let genesis = self.genesis_block().await?;
        Ok(genesis.id.as_bytes()[31])
    }

    // ==================== Transactions ====================

    /// Fetch a transaction; `None` if unknown
    pub async fn get_transaction(&self, id: &H256) -> Result<Option<NativeTransaction>, SdkError> {
        self.get_optional(&format!("/transactions/{}", id)).await
    }

    /// Fetch a receipt; `None` if the transaction is unknown or pending
    pub async fn get_receipt(&self, id: &H256) -> Result<Option<NativeReceipt>, SdkError> {
        self.get_optional(&format!("/transactions/{}/receipt", id))
            .await
    }

    /// Submit a signed, encoded transaction and return its id
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<H256, SdkError> {
        let body = json!({ "raw": format!("0x{}", hex::encode(raw)) });
        let response: Value = self.post("/transactions", &body).await?;
        let id = response
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::MissingField("id".to_string()))?;
        Ok(H256::from_hex(id)?)
    }

    // ==================== Accounts ====================

    /// Balance, energy and code flag of an account
    pub async fn get_account(
        &self,
        address: &Address,
        revision: Revision,
    ) -> Result<NativeAccount, SdkError> {
        self.get(&format!("/accounts/{}?revision={}", address, revision))
            .await
    }

    /// Deployed bytecode (empty for plain accounts)
    pub async fn get_code(&self, address: &Address, revision: Revision) -> Result<HexBytes, SdkError> {
        let value: Value = self
            .get(&format!("/accounts/{}/code?revision={}", address, revision))
            .await?;
        let code = value.get("code").cloned().unwrap_or(Value::Null);
        deserialize_response(code)
    }

    /// One storage slot
    pub async fn get_storage(
        &self,
        address: &Address,
        key: &H256,
        revision: Revision,
    ) -> Result<H256, SdkError> {
        let value: Value = self
            .get(&format!(
                "/accounts/{}/storage/{}?revision={}",
                address, key, revision
            ))
            .await?;
        let slot = value
            .get("value")
            .and_then(Value::as_str)
            .ok_or_else(|| SdkError::MissingField("value".to_string()))?;
        Ok(H256::from_hex(slot)?)
    }

    /// Simulate clauses at `revision` without submitting anything
    pub async fn inspect_clauses(
        &self,
        request: &InspectRequest,
        revision: Revision,
    ) -> Result<Vec<NativeCallResult>, SdkError> {
        self.post(&format!("/accounts/*?revision={}", revision), request)
            .await
    }

    // ==================== Logs ====================

    /// Raw `POST /logs/event`
    pub async fn query_event_logs(
        &self,
        query: &EventLogQuery,
    ) -> Result<Vec<NativeEventLog>, SdkError> {
        self.post("/logs/event", query).await
    }

    // ==================== Node ====================

    /// Connected peers as reported by the node
    pub async fn peers(&self) -> Result<Vec<Value>, SdkError> {
        let value = self.node.call(HttpMethod::Get, "/node/peers", None).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        deserialize_response(value)
    }

    // ==================== Debug ====================

    /// Trace one clause of a mined transaction. `target` is
    /// `blockID/txIndexOrID/clauseIndex`.
    pub async fn trace_clause(
        &self,
        target: &str,
        tracer: &str,
        config: Value,
    ) -> Result<Value, SdkError> {
        let body = json!({ "name": tracer, "config": config, "target": target });
        self.post("/debug/tracers", &body).await
    }

    /// Trace a simulated call
    pub async fn trace_call(&self, body: Value) -> Result<Value, SdkError> {
        self.post("/debug/tracers/call", &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockNodeClient;
    use crate::types::NativeClause;
    use thor_primitives::U256;

    fn client() -> (MockNodeClient, ThorClient) {
        let node = MockNodeClient::new();
        let thor = ThorClient::new(Arc::new(node.clone()));
        (node, thor)
    }

    #[tokio::test]
    async fn test_get_block_null_is_none() {
        let (node, thor) = client();
        node.set_response(HttpMethod::Get, "/blocks/42", Value::Null);
        assert!(thor.get_block(Revision::Number(42), false).await.unwrap().is_none());
        assert_eq!(node.calls()[0].path, "/blocks/42?expanded=false");
    }

    #[tokio::test]
    async fn test_chain_tag_from_genesis() {
        let (node, thor) = client();
        let mut id = [0u8; 32];
        id[31] = 0x27;
        node.set_response(
            HttpMethod::Get,
            "/blocks/0",
            json!({ "number": 0, "id": H256::from_bytes(id) }),
        );
        assert_eq!(thor.chain_tag().await.unwrap(), 0x27);
    }

    #[tokio::test]
    async fn test_send_raw_transaction() {
        let (node, thor) = client();
        let id = H256::from_low_u64_be(5);
        node.set_response(HttpMethod::Post, "/transactions", json!({ "id": id }));
        assert_eq!(thor.send_raw_transaction(&[0xf8, 0x01]).await.unwrap(), id);
        assert_eq!(node.calls()[0].body, Some(json!({ "raw": "0xf801" })));
    }

    #[tokio::test]
    async fn test_account_code_and_storage() {
        let (node, thor) = client();
        let addr = Address::from_bytes([7; 20]);
        node.set_response(
            HttpMethod::Get,
            &format!("/accounts/{}", addr),
            json!({ "balance": "0x64", "energy": "0x0", "hasCode": true }),
        );
        node.set_response(
            HttpMethod::Get,
            &format!("/accounts/{}/code", addr),
            json!({ "code": "0x6080" }),
        );
        node.set_response(
            HttpMethod::Get,
            &format!("/accounts/{}/storage/{}", addr, H256::ZERO),
            json!({ "value": H256::from_low_u64_be(3) }),
        );

        let account = thor.get_account(&addr, Revision::Best).await.unwrap();
        assert_eq!(account.balance, U256::from(100));
        assert!(account.has_code);
        assert_eq!(thor.get_code(&addr, Revision::Best).await.unwrap().0, vec![0x60, 0x80]);
        assert_eq!(
            thor.get_storage(&addr, &H256::ZERO, Revision::Best).await.unwrap(),
            H256::from_low_u64_be(3)
        );
    }

    #[tokio::test]
    async fn test_inspect_clauses_path_and_body() {
        let (node, thor) = client();
        node.set_response(
            HttpMethod::Post,
            "/accounts/*",
            json!([{ "data": "0x01", "gasUsed": 21000, "reverted": false, "vmError": "" }]),
        );
        let request = InspectRequest {
            clauses: vec![NativeClause {
                to: Some(Address::ZERO),
                value: U256::zero(),
                data: vec![0x01].into(),
            }],
            ..Default::default()
        };
        let results = thor.inspect_clauses(&request, Revision::Number(9)).await.unwrap();
        assert_eq!(results[0].gas_used, 21000);
        let call = &node.calls()[0];
        assert_eq!(call.path, "/accounts/*?revision=9");
        assert_eq!(call.body.as_ref().unwrap()["clauses"][0]["value"], "0x0");
    }

    #[tokio::test]
    async fn test_native_error_propagates() {
        let (node, thor) = client();
        node.set_error(HttpMethod::Get, "/transactions/0xbad", 400, "bad id");
        let id = H256::ZERO;
        node.set_error(HttpMethod::Get, &format!("/transactions/{}", id), 500, "boom");
        let err = thor.get_transaction(&id).await.unwrap_err();
        assert!(matches!(err, SdkError::Node { status: 500, .. }));
    }
}
