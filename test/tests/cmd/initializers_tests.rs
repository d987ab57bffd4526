use std::time::Duration;

use ethtrace::{
    cli::Options,
    initializers::{get_http_socket_addr, init_blockchain, init_metrics, init_rpc_context, init_store},
    utils::read_genesis_file,
};
use ethtrace_rpc::map_http_requests;
use ethtrace_test::rpc_request;
use serde_json::json;

const GENESIS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/genesis/ethtrace.json");

#[tokio::test]
async fn test_node_boots_from_the_fixture_genesis() {
    let opts = Options {
        network: GENESIS_PATH.to_string(),
        trace_timeout: 2,
        metrics_enabled: true,
        ..Default::default()
    };

    let genesis = read_genesis_file(&opts.network).unwrap();
    let store = init_store(genesis).await.unwrap();
    let metrics = init_metrics(&opts).unwrap();
    assert!(metrics.is_some());
    let context = init_rpc_context(&opts, init_blockchain(store), metrics);
    assert_eq!(context.trace_timeout, Duration::from_secs(2));

    let chain_id = map_http_requests(&rpc_request("eth_chainId", vec![]), context)
        .await
        .unwrap();
    assert_eq!(chain_id, json!("0x539"));
}

#[test]
fn test_http_socket_addr() {
    let opts = Options {
        http_addr: "127.0.0.1".to_string(),
        http_port: "9545".to_string(),
        ..Default::default()
    };
    assert_eq!(
        get_http_socket_addr(&opts).unwrap(),
        "127.0.0.1:9545".parse().unwrap()
    );
}
