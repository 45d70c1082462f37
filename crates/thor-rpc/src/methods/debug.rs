//! Debug namespace RPC methods (debug_*)
//!
//! Only tracing maps onto the node; every other `debug_*` method is
//! registered as unsupported.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::error::{RpcError, RpcResult};
use crate::handler::RpcContext;
use crate::types::{
    check_arity, format_bytes, format_u256, optional_block_param, parse_h256, require_param, TransactionRequest,
};

/// Tracer used when the caller names none
pub const DEFAULT_TRACER: &str = "call";

/// Native tracer name for an Ethereum tracer name: `callTracer` becomes
/// `call`, `prestateTracer` becomes `prestate`
pub fn native_tracer_name(name: Option<&str>) -> String {
    match name {
        None | Some("") => DEFAULT_TRACER.to_string(),
        Some(name) => name.strip_suffix("Tracer").unwrap_or(name).to_string(),
    }
}

/// Tracer name and config from an options object
fn tracer_options(value: Option<&Value>) -> RpcResult<(String, Value)> {
    let options = match value {
        None | Some(Value::Null) => return Ok((native_tracer_name(None), Value::Object(Map::new()))),
        Some(Value::Object(options)) => options,
        Some(_) => return Err(RpcError::invalid_params("tracer options must be an object")),
    };
    let name = match options.get("tracer") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.as_str()),
        Some(_) => return Err(RpcError::invalid_params("tracer must be a string")),
    };
    let config = options
        .get("tracerConfig")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    Ok((native_tracer_name(name), config))
}

/// debug_traceTransaction - Traces the first clause of a mined transaction
pub async fn debug_trace_transaction(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 2)?;
    let hash = parse_h256(require_param(&params, 0, "transaction hash")?)?;
    let (tracer, config) = tracer_options(params.get(1))?;

    let tx = ctx
        .client
        .get_transaction(&hash)
        .await?
        .ok_or_else(|| RpcError::provider(format!("transaction {} not found", hash)))?;
    let meta = tx
        .meta
        .ok_or_else(|| RpcError::provider(format!("transaction {} is pending", hash)))?;

    let target = format!("{}/{}/0", meta.block_id, tx.id);
    Ok(ctx.client.trace_clause(&target, &tracer, config).await?)
}

/// debug_traceCall - Traces a simulated call
pub async fn debug_trace_call(ctx: Arc<RpcContext>, params: Vec<Value>) -> RpcResult<Value> {
    check_arity(&params, 3)?;
    let request = TransactionRequest::from_value(require_param(&params, 0, "transaction")?)?;
    optional_block_param(&params, 1)?;
    let (tracer, config) = tracer_options(params.get(2))?;

    let mut body = json!({
        "name": tracer,
        "config": config,
        "value": format_u256(&request.value),
        "data": format_bytes(&request.data),
        "to": request.to.map(|to| to.to_hex()),
    });
    if let Some(from) = request.from {
        body["caller"] = Value::String(from.to_hex());
    }
    if let Some(gas) = request.gas {
        body["gas"] = json!(gas);
    }
    Ok(ctx.client.trace_call(body).await?)
}
