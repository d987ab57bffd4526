use std::{sync::Arc, time::Duration};

use ethtrace_blockchain::{Blockchain, SimulationOutcome, error::ChainError};
use ethtrace_common::{
    U256,
    types::{BlockIdentifier, BlockTag, CallParameters, TxKind},
};
use ethtrace_test::{CHAIN_HEAD, CountingEngine, SENDER, STORER, setup_store};
use ethtrace_vm::{ExecutionResult, tracing::TraceOptions};

const TIMEOUT: Duration = Duration::from_secs(5);

fn store_call() -> CallParameters {
    CallParameters {
        from: Some(SENDER),
        to: TxKind::Call(STORER),
        gas: Some(100_000),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_resolve_tags_and_numbers() {
    let blockchain = Blockchain::default_with_store(setup_store().await);

    let latest = blockchain
        .resolve_block(&BlockIdentifier::Tag(BlockTag::Latest))
        .unwrap();
    assert_eq!(latest.header.number, CHAIN_HEAD);
    let pending = blockchain
        .resolve_block(&BlockIdentifier::Tag(BlockTag::Pending))
        .unwrap();
    assert_eq!(pending.header, latest.header);
    let earliest = blockchain
        .resolve_block(&BlockIdentifier::Tag(BlockTag::Earliest))
        .unwrap();
    assert_eq!(earliest.header.number, 0);

    let missing = blockchain.resolve_block(&BlockIdentifier::Number(CHAIN_HEAD + 1));
    assert!(matches!(missing, Err(ChainError::BlockNotFound(_))));
    // Nothing was marked safe yet
    let safe = blockchain.resolve_block(&BlockIdentifier::Tag(BlockTag::Safe));
    assert!(matches!(safe, Err(ChainError::BlockNotFound(_))));
}

#[tokio::test]
async fn test_simulation_runs_once_and_leaves_the_store_alone() {
    let store = setup_store().await;
    let engine = Arc::new(CountingEngine::new());
    let blockchain = Blockchain::new(store.clone(), engine.clone());
    let block = blockchain
        .resolve_block(&BlockIdentifier::Number(50))
        .unwrap();
    let root_before = store.state_root(50).unwrap();

    let options = TraceOptions {
        calls: true,
        state: true,
        ..Default::default()
    };
    let outcome = blockchain
        .simulate_call(store_call(), options, block.clone(), TIMEOUT)
        .await
        .unwrap();
    assert_eq!(engine.runs(), 1);

    let SimulationOutcome::Valid { result, .. } = &outcome else {
        panic!("expected a valid simulation, got {outcome:?}");
    };
    assert!(matches!(result, ExecutionResult::Success { .. }));
    let trace = outcome.into_transaction_trace().unwrap();
    assert_eq!(trace.account_diffs().count(), 2);

    assert_eq!(store.state_root(50).unwrap(), root_before);
    assert_eq!(block.state.storage_slot(&STORER, &Default::default()), U256::zero());
}

#[tokio::test]
async fn test_refused_call_is_an_invalid_outcome() {
    let blockchain = Blockchain::default_with_store(setup_store().await);
    let block = blockchain
        .resolve_block(&BlockIdentifier::Tag(BlockTag::Latest))
        .unwrap();
    let call = CallParameters {
        // More than the block gas limit
        gas: Some(u64::MAX),
        ..store_call()
    };

    let outcome = blockchain
        .simulate_call(call, TraceOptions::default(), block, TIMEOUT)
        .await
        .unwrap();
    assert!(matches!(outcome, SimulationOutcome::Invalid(_)));
    assert!(outcome.into_transaction_trace().is_none());
}
