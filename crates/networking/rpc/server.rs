use std::future::IntoFuture;
use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Json, Router};
use ethtrace_metrics::MetricsTrace;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::context::RpcApiContext;
use crate::router::map_http_requests;
use crate::rpc_types::{
    RpcErr, RpcErrorMetadata, RpcErrorResponse, RpcRequest, RpcRequestId, RpcSuccessResponse,
};

#[derive(Deserialize)]
#[serde(untagged)]
pub enum RpcRequestWrapper {
    Single(RpcRequest),
    Multiple(Vec<RpcRequest>),
}

/// Serves JSON-RPC on `http_addr` until ctrl-c is received.
///
/// When `metrics` is given the registry is exposed on `GET /metrics` as well.
pub async fn start_api(
    http_addr: SocketAddr,
    service_context: RpcApiContext,
    metrics: Option<MetricsTrace>,
) -> Result<(), std::io::Error> {
    let http_router = build_router(service_context, metrics);
    let http_listener = TcpListener::bind(http_addr).await?;

    let http_server = axum::serve(http_listener, http_router)
        .with_graceful_shutdown(shutdown_signal())
        .into_future();

    info!("Starting HTTP server at {http_addr}");

    http_server
        .await
        .inspect_err(|e| info!("Error shutting down server: {:?}", e))
}

pub fn build_router(service_context: RpcApiContext, metrics: Option<MetricsTrace>) -> Router {
    // All request headers allowed.
    // All methods allowed.
    // All origins allowed.
    // All headers exposed.
    let cors = CorsLayer::permissive();

    let mut router = Router::new()
        .route("/", axum::routing::post(handle_http_request))
        .with_state(service_context);
    if let Some(metrics) = metrics {
        router = router.merge(
            Router::new()
                .route("/metrics", axum::routing::get(handle_metrics_request))
                .with_state(metrics),
        );
    }
    router.layer(cors)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl+C handler: {err}");
    }
}

async fn handle_http_request(
    State(service_context): State<RpcApiContext>,
    body: String,
) -> Json<Value> {
    let res = match serde_json::from_str::<RpcRequestWrapper>(&body) {
        Ok(RpcRequestWrapper::Single(request)) => {
            let res = map_http_requests(&request, service_context).await;
            rpc_response(request.id, res)
        }
        Ok(RpcRequestWrapper::Multiple(requests)) => {
            let mut responses = Vec::new();
            for req in requests {
                let res = map_http_requests(&req, service_context.clone()).await;
                responses.push(rpc_response(req.id, res));
            }
            Value::Array(responses)
        }
        Err(_) => rpc_response(
            RpcRequestId::String("".to_string()),
            Err(RpcErr::BadParams("Invalid request body".to_string())),
        ),
    };
    Json(res)
}

async fn handle_metrics_request(
    State(metrics): State<MetricsTrace>,
) -> Result<String, (StatusCode, String)> {
    metrics
        .gather_metrics()
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

pub fn rpc_response<E>(id: RpcRequestId, res: Result<Value, E>) -> Value
where
    E: Into<RpcErrorMetadata>,
{
    match res {
        Ok(result) => serde_json::to_value(RpcSuccessResponse {
            id,
            jsonrpc: "2.0".to_string(),
            result,
        }),
        Err(error) => serde_json::to_value(RpcErrorResponse {
            id,
            jsonrpc: "2.0".to_string(),
            error: error.into(),
        }),
    }
    .unwrap_or_else(|err| {
        json!({
            "jsonrpc": "2.0",
            "error": { "code": -32603, "message": format!("Internal Error: {err}") }
        })
    })
}
