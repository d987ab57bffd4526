// Tests for the trace_call RPC endpoint.
//
// Every request goes through `map_http_requests`, the same entry point the HTTP server
// uses, against the fixture chain built by `ethtrace_test::setup_store` (genesis plus
// 100 empty blocks, chain id 1337, base fee 7 wei).

use std::{sync::Arc, time::Duration};

use ethtrace_common::{H256, U256, tracing::TraceType, types::AccountUpdate};
use ethtrace_rpc::{
    RpcErr, RpcErrorMetadata, RpcHandler, TraceCallRequest, TraceStage, map_http_requests,
};
use ethtrace_test::{
    CALLER, CHAIN_HEAD, CountingEngine, CrashingEngine, RecordingObserver, SENDER, STORER,
    StalledEngine, context_with_engine, default_context_with_storage, rpc_request, setup_store,
};
use ethtrace_vm::ExecutionEngine;
use serde_json::{Value, json};

fn addr(address: ethtrace_common::Address) -> String {
    format!("{address:#x}")
}

fn hex_u64(value: &Value) -> u64 {
    u64::from_str_radix(value.as_str().unwrap().strip_prefix("0x").unwrap(), 16).unwrap()
}

fn error_code(err: RpcErr) -> i32 {
    RpcErrorMetadata::from(err).code
}

fn transfer() -> Value {
    json!({ "to": "0x0000000000000000000000000000000000000abc", "value": "0x1", "data": "0x" })
}

fn store_call() -> Value {
    json!({ "from": addr(SENDER), "to": addr(STORER), "gas": "0x186a0" })
}

type Traced = (Result<Value, RpcErr>, Arc<CountingEngine>, Arc<RecordingObserver>);
type Observed = (Result<Value, RpcErr>, Arc<RecordingObserver>);

async fn trace_call(params: Vec<Value>) -> Traced {
    trace_call_with_engine(params, CountingEngine::new()).await
}

async fn trace_call_with_engine(
    params: Vec<Value>,
    engine: CountingEngine,
) -> Traced {
    let engine = Arc::new(engine);
    let observer = Arc::new(RecordingObserver::default());
    let context = context_with_engine(setup_store().await, engine.clone(), observer.clone());
    let request = rpc_request("trace_call", params);
    let result = map_http_requests(&request, context).await;
    (result, engine, observer)
}

// ── Parse-level tests ──────────────────────────────────────────────

#[test]
fn test_parse_requires_call_and_trace_types() {
    assert!(TraceCallRequest::parse(&None).is_err());
    assert!(TraceCallRequest::parse(&Some(vec![transfer()])).is_err());
    assert!(TraceCallRequest::parse(&Some(vec![transfer(), json!(["trace"])])).is_ok());
    assert!(
        TraceCallRequest::parse(&Some(vec![transfer(), json!(["trace"]), json!("0x64")])).is_ok()
    );
}

#[test]
fn test_parse_rejects_conflicting_fee_fields() {
    let call = json!({ "to": addr(STORER), "gasPrice": "0x1", "maxFeePerGas": "0x2" });
    let err = TraceCallRequest::parse(&Some(vec![call, json!(["trace"])])).unwrap_err();
    assert_eq!(error_code(err), -32602);
}

// ── Rejections before the engine runs ──────────────────────────────

#[tokio::test]
async fn test_missing_block_is_block_not_found() {
    let (result, engine, observer) =
        trace_call(vec![transfer(), json!(["trace"]), json!("0xf423f")]).await;

    let err = RpcErrorMetadata::from(result.unwrap_err());
    assert_eq!(err.code, -39001);
    assert_eq!(err.data.as_deref(), Some("0xf423f"));
    assert_eq!(engine.runs(), 0);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::Validated, "block_not_found")]
    );
}

#[tokio::test]
async fn test_missing_block_by_number_is_block_not_found() {
    let (result, engine, _) = trace_call(vec![transfer(), json!(["trace"]), json!(999999)]).await;
    assert_eq!(error_code(result.unwrap_err()), -39001);
    assert_eq!(engine.runs(), 0);
}

#[tokio::test]
async fn test_empty_or_unknown_trace_types_are_rejected_before_resolution() {
    for trace_types in [json!([]), json!(["bogus"]), json!(["trace", "callTracer"]), json!("trace")] {
        // The block does not exist either, the trace types must be rejected first
        let (result, engine, observer) =
            trace_call(vec![transfer(), trace_types.clone(), json!("0xf423f")]).await;

        assert_eq!(error_code(result.unwrap_err()), -32602, "{trace_types}");
        assert_eq!(engine.runs(), 0);
        assert_eq!(observer.transitions(), vec![TraceStage::Received]);
        assert_eq!(
            observer.rejections(),
            vec![(TraceStage::Received, "unsupported_trace_kind")]
        );
    }
}

#[tokio::test]
async fn test_malformed_call_is_rejected() {
    let call = json!({ "to": addr(STORER), "gas": "not a number" });
    let (result, engine, observer) = trace_call(vec![call, json!(["trace"])]).await;

    assert_eq!(error_code(result.unwrap_err()), -32602);
    assert_eq!(engine.runs(), 0);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::Received, "malformed_call_parameters")]
    );
}

#[tokio::test]
async fn test_doubly_prefixed_block_number_is_malformed() {
    let (result, engine, observer) =
        trace_call(vec![transfer(), json!(["trace"]), json!("0x0x64")]).await;

    assert_eq!(error_code(result.unwrap_err()), -32602);
    assert_eq!(engine.runs(), 0);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::Received, "malformed_call_parameters")]
    );
}

#[tokio::test]
async fn test_unprefixed_quantities_are_decimal() {
    // The sender nonce is 0, a nonce of ten must be reported as such
    let call = json!({ "from": addr(SENDER), "to": addr(STORER), "gas": "100000", "nonce": "10" });
    let (result, _, _) = trace_call(vec![call, json!(["trace"]), json!("0x64")]).await;
    let err = RpcErrorMetadata::from(result.unwrap_err());
    assert_eq!(err.code, -32603);
    assert!(err.message.contains("got 10"), "{}", err.message);

    let call = json!({ "from": addr(SENDER), "to": addr(STORER), "gas": "100000", "nonce": "0" });
    let (result, _, _) = trace_call(vec![call, json!(["trace"]), json!("0x64")]).await;
    let result = result.unwrap();
    // 100000 minus the 21000 intrinsic cost
    assert_eq!(hex_u64(&result["trace"][0]["action"]["gas"]), 79_000);
}

#[tokio::test]
async fn test_trace_type_unavailable_at_block_is_a_client_error() {
    let (result, engine, observer) = trace_call_with_engine(
        vec![store_call(), json!(["trace", "vmTrace"]), json!("latest")],
        CountingEngine::without(TraceType::VmTrace),
    )
    .await;

    let err = RpcErrorMetadata::from(result.unwrap_err());
    assert_eq!(err.code, -32602);
    assert!(err.message.contains("vmTrace"), "{}", err.message);
    assert_eq!(engine.runs(), 0);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::BlockResolved, "unsupported_trace_kind")]
    );
}

// ── Simulation outcomes ────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_simulation_is_internal_error() {
    // The sender nonce is 0
    let call = json!({ "from": addr(SENDER), "to": addr(STORER), "nonce": "0x5" });
    let (result, engine, observer) = trace_call(vec![call, json!(["trace"]), json!("0x64")]).await;

    let err = RpcErrorMetadata::from(result.unwrap_err());
    assert_eq!(err.code, -32603);
    assert!(err.message.to_lowercase().contains("nonce"), "{}", err.message);
    assert_eq!(engine.runs(), 1);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::Simulated, "simulation_invalid")]
    );
}

async fn trace_call_on(engine: Arc<dyn ExecutionEngine>, timeout: Duration) -> Observed {
    let observer = Arc::new(RecordingObserver::default());
    let context = context_with_engine(setup_store().await, engine, observer.clone())
        .with_trace_timeout(timeout);
    let request = rpc_request("trace_call", vec![store_call(), json!(["trace"]), json!("0x64")]);
    (map_http_requests(&request, context).await, observer)
}

#[tokio::test]
async fn test_simulation_timeout_is_internal_error() {
    let (result, observer) = trace_call_on(
        Arc::new(StalledEngine(Duration::from_millis(500))),
        Duration::from_millis(20),
    )
    .await;

    let err = RpcErrorMetadata::from(result.unwrap_err());
    assert_eq!(err.code, -32603);
    assert!(err.message.contains("Timeout"), "{}", err.message);
    assert_eq!(observer.simulations(), 0);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::BlockResolved, "internal")]
    );
}

#[tokio::test]
async fn test_crashing_engine_is_internal_error() {
    let (result, observer) =
        trace_call_on(Arc::new(CrashingEngine), Duration::from_secs(5)).await;

    assert_eq!(error_code(result.unwrap_err()), -32603);
    assert_eq!(
        observer.rejections(),
        vec![(TraceStage::BlockResolved, "internal")]
    );
}

#[tokio::test]
async fn test_plain_transfer_returns_only_the_call_trace() {
    let (result, engine, observer) =
        trace_call(vec![transfer(), json!(["trace"]), json!("0x64")]).await;
    let result = result.unwrap();

    let object = result.as_object().unwrap();
    assert!(!object.contains_key("vmTrace"));
    assert!(!object.contains_key("stateDiff"));
    assert_eq!(result["output"], json!("0x"));

    let trace = result["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0]["type"], json!("call"));
    assert_eq!(trace[0]["action"]["callType"], json!("call"));
    assert_eq!(trace[0]["action"]["value"], json!("0x1"));
    assert_eq!(trace[0]["traceAddress"], json!([]));
    assert_eq!(trace[0]["result"]["gasUsed"], json!("0x0"));
    assert!(trace[0].get("error").is_none());

    assert_eq!(engine.runs(), 1);
    assert_eq!(observer.simulations(), 1);
    assert!(observer.rejections().is_empty());
    assert_eq!(
        observer.transitions(),
        vec![
            TraceStage::Received,
            TraceStage::Validated,
            TraceStage::BlockResolved,
            TraceStage::Simulated,
            TraceStage::Assembled,
            TraceStage::Done,
        ]
    );
}

#[tokio::test]
async fn test_failed_execution_is_a_successful_response() {
    // Init code made of a single INVALID instruction
    let call = json!({ "from": addr(SENDER), "data": "0xfe", "gas": "0x186a0" });
    let (result, engine, observer) = trace_call(vec![call, json!(["trace"])]).await;
    let result = result.unwrap();

    assert_eq!(engine.runs(), 1);
    assert!(observer.rejections().is_empty());
    let trace = result["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 1);
    assert_eq!(trace[0]["type"], json!("create"));
    assert!(trace[0]["error"].is_string());
    assert!(trace[0].get("result").is_none());
}

#[tokio::test]
async fn test_all_trace_types_come_from_the_same_execution() {
    let call = json!({ "from": addr(SENDER), "to": addr(CALLER), "gas": "0x186a0" });
    let (result, engine, _) = trace_call(vec![
        call,
        json!(["stateDiff", "trace", "vmTrace", "trace"]),
        json!("0x64"),
    ])
    .await;
    let result = result.unwrap();
    assert_eq!(engine.runs(), 1);

    let keys: Vec<&String> = result.as_object().unwrap().keys().collect();
    assert_eq!(keys.len(), 4, "{keys:?}");

    // Call tree: the caller frame and the nested call into the storer
    let trace = result["trace"].as_array().unwrap();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0]["subtraces"], json!(1));
    assert_eq!(trace[1]["traceAddress"], json!([0]));
    assert_eq!(trace[1]["action"]["from"], json!(addr(CALLER)));
    assert_eq!(trace[1]["action"]["to"], json!(addr(STORER)));

    // Gas left after the last instruction matches the gas the frame reports as used
    let root_ops = result["vmTrace"]["ops"].as_array().unwrap();
    let last_op = root_ops.last().unwrap();
    let gas_left = last_op["ex"]["used"].as_u64().unwrap();
    let frame_gas = hex_u64(&trace[0]["action"]["gas"]);
    let frame_gas_used = hex_u64(&trace[0]["result"]["gasUsed"]);
    assert_eq!(frame_gas - gas_left, frame_gas_used);

    // The nested call is traced under the CALL instruction that made it
    let call_op = root_ops.iter().find(|op| !op["sub"].is_null()).unwrap();
    let sub_ops = call_op["sub"]["ops"].as_array().unwrap();
    assert_eq!(sub_ops.len(), 4);
    let sstore = &sub_ops[2];
    assert_eq!(sstore["ex"]["store"]["key"], json!("0x0"));
    assert_eq!(sstore["ex"]["store"]["val"], json!("0x1"));
    let sub_gas_used: u64 = sub_ops.iter().map(|op| op["cost"].as_u64().unwrap()).sum();
    assert_eq!(sub_gas_used, hex_u64(&trace[1]["result"]["gasUsed"]));

    // The storage write done by the nested call shows up in the state diff
    let storer = &result["stateDiff"][addr(STORER)];
    let slot = storer["storage"][format!("{:#x}", H256::zero())]["*"].clone();
    assert_eq!(slot["from"], json!(format!("{:#x}", H256::zero())));
    assert_eq!(
        slot["to"],
        json!(format!("{:#x}", H256::from_low_u64_be(1)))
    );
    assert_eq!(storer["balance"], json!("="));
    let sender = &result["stateDiff"][addr(SENDER)];
    assert_eq!(sender["nonce"]["*"], json!({ "from": "0x0", "to": "0x1" }));
}

#[tokio::test]
async fn test_same_request_twice_gives_the_same_result() {
    let store = setup_store().await;
    let context = default_context_with_storage(store);
    let request = rpc_request(
        "trace_call",
        vec![store_call(), json!(["trace", "vmTrace", "stateDiff"]), json!("0x64")],
    );

    let first = map_http_requests(&request, context.clone()).await.unwrap();
    let second = map_http_requests(&request, context).await.unwrap();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn test_tracing_never_changes_chain_state() {
    let store = setup_store().await;
    let roots_before: Vec<_> = (0..=CHAIN_HEAD)
        .map(|number| store.state_root(number).unwrap())
        .collect();

    let context = default_context_with_storage(store.clone());
    for block in [json!("0x0"), json!("0x32"), json!("latest"), json!("earliest")] {
        let request = rpc_request(
            "trace_call",
            vec![store_call(), json!(["trace", "stateDiff"]), block],
        );
        map_http_requests(&request, context.clone()).await.unwrap();
    }

    let roots_after: Vec<_> = (0..=CHAIN_HEAD)
        .map(|number| store.state_root(number).unwrap())
        .collect();
    assert_eq!(roots_before, roots_after);
    assert_eq!(store.get_latest_block_number().unwrap(), CHAIN_HEAD);
}

#[tokio::test]
async fn test_calls_run_on_the_state_of_the_requested_block() {
    let store = setup_store().await;
    // Block 101 already holds the value the storer writes
    let mut update = AccountUpdate::new(STORER);
    update.added_storage.insert(H256::zero(), U256::one());
    store.add_block(u64::MAX / 2, &[update]).await.unwrap();

    let context = default_context_with_storage(store);
    let diff_at = |block: Value| {
        let context = context.clone();
        async move {
            let request = rpc_request("trace_call", vec![store_call(), json!(["stateDiff"]), block]);
            map_http_requests(&request, context).await.unwrap()["stateDiff"].clone()
        }
    };

    let historical = diff_at(json!("0x64")).await;
    assert!(!historical[addr(STORER)].is_null());

    // Rewriting the same value leaves the storer untouched at the head
    let latest = diff_at(json!("latest")).await;
    assert!(latest[addr(STORER)].is_null());
}
