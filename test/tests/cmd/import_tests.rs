use ethtrace::{
    cli::Options,
    initializers::{import_blocks, init_blockchain, init_rpc_context, init_store},
    utils::{read_chain_file, read_genesis_file},
};
use ethtrace_common::{
    Address, U256,
    types::{BlockIdentifier, BlockTag, ChainFile},
};
use ethtrace_rpc::{RpcApiContext, map_http_requests};
use ethtrace_storage::{ChainStateLookup, Store};
use ethtrace_test::{SENDER, STORER, rpc_request};
use serde_json::{Value, json};

const GENESIS_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/genesis/ethtrace.json");
const CHAIN_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../fixtures/chain/ethtrace.json");

async fn imported_store() -> Store {
    let store = init_store(read_genesis_file(GENESIS_PATH).unwrap())
        .await
        .unwrap();
    import_blocks(&store, read_chain_file(CHAIN_PATH).unwrap())
        .await
        .unwrap();
    store
}

fn context(store: Store) -> RpcApiContext {
    init_rpc_context(&Options::default(), init_blockchain(store), None)
}

async fn state_diff_at(context: &RpcApiContext, block: &str) -> Value {
    let call = json!({ "from": format!("{SENDER:#x}"), "to": format!("{STORER:#x}"), "gas": "0x186a0" });
    let request = rpc_request("trace_call", vec![call, json!(["stateDiff"]), json!(block)]);
    map_http_requests(&request, context.clone()).await.unwrap()["stateDiff"].clone()
}

#[tokio::test]
async fn test_imported_blocks_are_traceable() {
    let context = context(imported_store().await);

    let head = map_http_requests(&rpc_request("eth_blockNumber", vec![]), context.clone())
        .await
        .unwrap();
    assert_eq!(head, json!("0x3"));

    // Genesis leaves the slot empty, block 1 sets it and block 3 clears it again
    let storer = format!("{STORER:#x}");
    assert!(!state_diff_at(&context, "0x0").await[&storer].is_null());
    assert!(state_diff_at(&context, "0x1").await[&storer].is_null());
    assert!(!state_diff_at(&context, "latest").await[&storer].is_null());

    // The sender nonce bumped by block 1 is the starting point of later calls
    let sender = format!("{SENDER:#x}");
    let at_safe = state_diff_at(&context, "safe").await;
    assert_eq!(at_safe[&sender]["nonce"]["*"], json!({ "from": "0x1", "to": "0x2" }));
    let at_finalized = state_diff_at(&context, "finalized").await;
    assert_eq!(at_finalized[&sender]["nonce"]["*"], json!({ "from": "0x1", "to": "0x2" }));
    let at_genesis = state_diff_at(&context, "earliest").await;
    assert_eq!(at_genesis[&sender]["nonce"]["*"], json!({ "from": "0x0", "to": "0x1" }));
}

#[tokio::test]
async fn test_imported_accounts_follow_their_block() {
    let store = imported_store().await;
    let created = Address::repeat_byte(0xd0);
    let account_at = |number: u64| {
        let header = store
            .resolve_header(&BlockIdentifier::Number(number))
            .unwrap()
            .unwrap();
        store
            .state_snapshot_at(&header)
            .unwrap()
            .unwrap()
            .get_account(&created)
            .cloned()
    };
    assert!(account_at(1).is_none());
    assert_eq!(account_at(2).unwrap().info.balance, U256::one());
    assert!(account_at(3).is_none());

    let safe = store
        .resolve_header(&BlockIdentifier::Tag(BlockTag::Safe))
        .unwrap()
        .unwrap();
    assert_eq!(safe.number, 2);
}

#[tokio::test]
async fn test_marks_must_point_at_imported_blocks() {
    let store = init_store(read_genesis_file(GENESIS_PATH).unwrap())
        .await
        .unwrap();
    let chain = ChainFile {
        safe: Some(5),
        ..Default::default()
    };
    assert!(import_blocks(&store, chain).await.is_err());
}
