//! RPC HTTP server
//!
//! Axum server exposing the JSON-RPC endpoint at `POST /`.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use log::info;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use super::{handle_request, JsonRpcRequest, JsonRpcResponse, RpcState};

/// Serve the RPC interface on `port` until the process exits.
pub async fn start_rpc_server(state: Arc<RpcState>, port: u16) -> std::io::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", post(handle_rpc))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("rpc listening on port {port}");
    axum::serve(listener, app).await
}

async fn handle_rpc(
    State(state): State<Arc<RpcState>>,
    Json(request): Json<JsonRpcRequest>,
) -> (StatusCode, Json<JsonRpcResponse>) {
    let response = handle_request(&state, request);
    (StatusCode::OK, Json(response))
}
