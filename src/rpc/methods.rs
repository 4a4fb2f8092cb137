//! RPC method implementations
//!
//! JSON-RPC 2.0 calls for inspecting the ledger and submitting payments.
//! Every handler is a thin read or a call into the node; bad parameters
//! become error responses, never panics.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::crypto::Hash;
use crate::node::Node;
use crate::p2p::PeerHub;
use crate::validation::validate_address;

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Option<Value>,
    pub id: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub result: Option<Value>,
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn error(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// State shared with every RPC handler.
pub struct RpcState {
    pub node: Arc<Node>,
    pub hub: Arc<PeerHub>,
}

/// Dispatch a JSON-RPC request.
pub fn handle_request(state: &RpcState, request: JsonRpcRequest) -> JsonRpcResponse {
    match request.method.as_str() {
        "getblockcount" => get_block_count(state, request.id),
        "getlatestblock" => get_latest_block(state, request.id),
        "getblocks" => get_blocks(state, request.id),
        "getblock" => get_block(state, request.id, request.params),
        "getbalance" => get_balance(state, request.id, request.params),
        "getaddress" => get_address(state, request.id),
        "getmempool" => get_mempool(state, request.id),
        "getdifficulty" => get_difficulty(state, request.id),
        "getinfo" => get_info(state, request.id),
        "sendtoaddress" => send_to_address(state, request.id, request.params),
        _ => JsonRpcResponse::error(
            request.id,
            -32601,
            format!("Method not found: {}", request.method),
        ),
    }
}

fn get_block_count(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.latest_block().index))
}

fn get_latest_block(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.latest_block()))
}

fn get_blocks(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.chain()))
}

fn get_block(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let hash_str = match first_string_param(&params) {
        Some(s) => s,
        None => return JsonRpcResponse::error(id, -32602, "expected block hash".into()),
    };
    let hash = match Hash::from_hex(&hash_str) {
        Ok(h) => h,
        Err(_) => return JsonRpcResponse::error(id, -5, "block not found".into()),
    };
    let ledger = state.node.ledger.lock().expect("ledger lock");
    match ledger.chain().iter().find(|b| b.hash == hash) {
        Some(block) => JsonRpcResponse::success(id, json!(block)),
        None => JsonRpcResponse::error(id, -5, "block not found".into()),
    }
}

fn get_balance(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let address = match first_string_param(&params) {
        Some(s) => match validate_address(&s) {
            Ok(a) => a,
            Err(_) => return JsonRpcResponse::error(id, -32602, "malformed address".into()),
        },
        None => state.node.address(),
    };
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.balance(&address)))
}

fn get_address(state: &RpcState, id: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(id, json!(state.node.address().to_string()))
}

fn get_mempool(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.mempool_snapshot()))
}

fn get_difficulty(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    JsonRpcResponse::success(id, json!(ledger.next_difficulty()))
}

fn get_info(state: &RpcState, id: Value) -> JsonRpcResponse {
    let ledger = state.node.ledger.lock().expect("ledger lock");
    let info = json!({
        "height": ledger.latest_block().index,
        "tipHash": ledger.latest_block().hash,
        "cumulativeWork": ledger.cumulative_work().to_string(),
        "difficulty": ledger.next_difficulty(),
        "mempoolSize": ledger.mempool().len(),
        "utxoCount": ledger.utxo_set().len(),
        "peers": state.hub.peer_count(),
    });
    JsonRpcResponse::success(id, info)
}

fn send_to_address(state: &RpcState, id: Value, params: Option<Value>) -> JsonRpcResponse {
    let (dest_str, amount) = match params {
        Some(Value::Array(arr)) if arr.len() == 2 => {
            let dest = arr[0].as_str().map(str::to_string);
            let amount = arr[1].as_u64();
            match (dest, amount) {
                (Some(d), Some(a)) => (d, a),
                _ => {
                    return JsonRpcResponse::error(
                        id,
                        -32602,
                        "expected [destination, amount]".into(),
                    )
                }
            }
        }
        _ => return JsonRpcResponse::error(id, -32602, "expected [destination, amount]".into()),
    };
    let destination = match validate_address(&dest_str) {
        Ok(a) => a,
        Err(_) => return JsonRpcResponse::error(id, -32602, "malformed address".into()),
    };
    match state.node.submit_payment(destination, amount) {
        Ok(tx) => JsonRpcResponse::success(id, json!(tx.id)),
        Err(err) => JsonRpcResponse::error(id, -6, err.to_string()),
    }
}

fn first_string_param(params: &Option<Value>) -> Option<String> {
    match params {
        Some(Value::Array(arr)) => arr.first().and_then(Value::as_str).map(str::to_string),
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}
