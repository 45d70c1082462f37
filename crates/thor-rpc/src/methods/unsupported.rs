//! Methods registered only to report that they are not supported
//!
//! Proof-of-work, uncles, filter polling, pending pools, engine API and raw
//! debug access have no native counterpart. Registering them keeps the
//! registry covering the whole JSON-RPC surface, so callers get
//! NotImplemented instead of method-not-found.

/// Method names answered with NotImplemented
pub const METHODS: &[&str] = &[
    // Legacy proof-of-work and uncles
    "eth_coinbase",
    "eth_hashrate",
    "eth_mining",
    "eth_getWork",
    "eth_submitWork",
    "eth_submitHashrate",
    "eth_getUncleByBlockHashAndIndex",
    "eth_getUncleByBlockNumberAndIndex",
    "eth_getUncleCountByBlockHash",
    "eth_getUncleCountByBlockNumber",
    // Filter polling
    "eth_newFilter",
    "eth_newBlockFilter",
    "eth_newPendingTransactionFilter",
    "eth_getFilterChanges",
    "eth_getFilterLogs",
    "eth_uninstallFilter",
    // Fee market, signing and proofs
    "eth_feeHistory",
    "eth_maxPriorityFeePerGas",
    "eth_blobBaseFee",
    "eth_protocolVersion",
    "eth_sign",
    "eth_signTypedData_v4",
    "eth_getProof",
    "eth_createAccessList",
    // Raw debug access
    "debug_getBadBlocks",
    "debug_getRawBlock",
    "debug_getRawHeader",
    "debug_getRawReceipts",
    "debug_getRawTransaction",
    "debug_traceBlockByHash",
    "debug_traceBlockByNumber",
    // Engine API
    "engine_exchangeCapabilities",
    "engine_exchangeTransitionConfigurationV1",
    "engine_forkchoiceUpdatedV1",
    "engine_forkchoiceUpdatedV2",
    "engine_forkchoiceUpdatedV3",
    "engine_getPayloadBodiesByHashV1",
    "engine_getPayloadBodiesByRangeV1",
    "engine_getPayloadV1",
    "engine_getPayloadV2",
    "engine_getPayloadV3",
    "engine_newPayloadV1",
    "engine_newPayloadV2",
    "engine_newPayloadV3",
    // Transaction pool
    "txpool_content",
    "txpool_contentFrom",
    "txpool_inspect",
    "txpool_status",
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_no_duplicates() {
        let unique: HashSet<_> = METHODS.iter().collect();
        assert_eq!(unique.len(), METHODS.len());
    }
}
