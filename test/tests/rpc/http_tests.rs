use std::{net::SocketAddr, sync::Arc};

use ethtrace_metrics::MetricsTrace;
use ethtrace_rpc::{LoggingObserver, MetricsObserver, ObserverSet, build_router};
use ethtrace_test::{SENDER, STORER, default_context_with_storage, setup_store};
use serde_json::{Value, json};
use tokio::net::TcpListener;

async fn start_test_api(metrics: Option<MetricsTrace>) -> SocketAddr {
    let mut context = default_context_with_storage(setup_store().await);
    if let Some(metrics) = &metrics {
        context = context.with_observer(Arc::new(ObserverSet::new(vec![
            Arc::new(LoggingObserver),
            Arc::new(MetricsObserver::new(metrics.clone())),
        ])));
    }
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(context, metrics))
            .await
            .unwrap();
    });
    addr
}

async fn post(addr: SocketAddr, body: Value) -> Value {
    reqwest::Client::new()
        .post(format!("http://{addr}"))
        .json(&body)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn trace_call_body(id: u64, block: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "trace_call",
        "params": [
            { "from": format!("{SENDER:#x}"), "to": format!("{STORER:#x}"), "gas": "0x186a0" },
            ["trace", "stateDiff"],
            block
        ]
    })
}

#[tokio::test]
async fn test_trace_call_over_http() {
    let addr = start_test_api(None).await;

    let response = post(addr, trace_call_body(7, "0x64")).await;
    assert_eq!(response["id"], json!(7));
    assert_eq!(response["jsonrpc"], json!("2.0"));
    assert!(response.get("error").is_none(), "{response}");
    assert_eq!(response["result"]["trace"].as_array().unwrap().len(), 1);
    assert!(response["result"]["stateDiff"].is_object());

    let response = post(addr, trace_call_body(8, "0xf423f")).await;
    assert_eq!(response["id"], json!(8));
    assert_eq!(response["error"]["code"], json!(-39001));
    assert!(response.get("result").is_none());
}

#[tokio::test]
async fn test_batch_keeps_request_ids() {
    let addr = start_test_api(None).await;

    let response = post(
        addr,
        json!([
            trace_call_body(1, "latest"),
            { "jsonrpc": "2.0", "id": "two", "method": "trace_block", "params": [] },
            { "jsonrpc": "2.0", "id": 3, "method": "eth_blockNumber", "params": [] }
        ]),
    )
    .await;

    let responses = response.as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["id"], json!(1));
    assert!(responses[0]["result"].is_object());
    assert_eq!(responses[1]["id"], json!("two"));
    assert_eq!(responses[1]["error"]["code"], json!(-32601));
    assert_eq!(responses[2]["result"], json!("0x64"));
}

#[tokio::test]
async fn test_invalid_body_is_a_json_rpc_error() {
    let addr = start_test_api(None).await;
    let response: Value = reqwest::Client::new()
        .post(format!("http://{addr}"))
        .body("not json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["error"]["code"], json!(-32602));
}

#[tokio::test]
async fn test_metrics_endpoint_counts_requests() {
    let addr = start_test_api(Some(MetricsTrace::new().unwrap())).await;

    post(addr, trace_call_body(1, "latest")).await;
    post(addr, trace_call_body(2, "0xf423f")).await;

    let metrics = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics.contains(
        r#"ethtrace_trace_call_requests_total{error_kind="",outcome="success"} 1"#
    ));
    assert!(metrics.contains(
        r#"ethtrace_trace_call_requests_total{error_kind="block_not_found",outcome="error"} 1"#
    ));
    assert!(metrics.contains("ethtrace_trace_call_simulation_seconds_count 1"));
}

#[tokio::test]
async fn test_metrics_endpoint_is_off_by_default() {
    let addr = start_test_api(None).await;
    let status = reqwest::get(format!("http://{addr}/metrics"))
        .await
        .unwrap()
        .status();
    assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
}
