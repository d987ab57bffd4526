use ethtrace_rpc::map_http_requests;
use ethtrace_test::{CHAIN_HEAD, default_context_with_storage, rpc_request, setup_store};
use serde_json::json;

#[tokio::test]
async fn test_web3_client_version() {
    let context = default_context_with_storage(setup_store().await);
    let version = map_http_requests(&rpc_request("web3_clientVersion", vec![]), context)
        .await
        .unwrap();

    let version = version.as_str().unwrap();
    assert!(
        version.starts_with(&format!("ethtrace/v{}/", env!("CARGO_PKG_VERSION"))),
        "{version}"
    );
    assert!(version.ends_with(std::env::consts::ARCH));
}

#[tokio::test]
async fn test_chain_id_and_block_number() {
    let context = default_context_with_storage(setup_store().await);

    let chain_id = map_http_requests(&rpc_request("eth_chainId", vec![]), context.clone())
        .await
        .unwrap();
    assert_eq!(chain_id, json!("0x539"));

    let block_number = map_http_requests(&rpc_request("eth_blockNumber", vec![]), context)
        .await
        .unwrap();
    assert_eq!(block_number, json!(format!("{CHAIN_HEAD:#x}")));
}
