//! Shared fixtures for the integration tests.
//!
//! The fixture chain is the genesis in `fixtures/genesis/ethtrace.json` followed by
//! [`CHAIN_HEAD`] empty blocks.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use ethtrace_blockchain::Blockchain;
use ethtrace_common::{
    Address,
    tracing::TraceType,
    types::{BlockHeader, CallParameters, Genesis},
};
use ethtrace_rpc::{
    RpcApiContext, RpcRequest, RpcRequestId, TraceCallError, TraceObserver, TraceStage,
};
use ethtrace_storage::{StateSnapshot, Store};
use ethtrace_vm::{EngineOutcome, Evm, EvmError, ExecutionEngine, tracing::Tracer};
use serde_json::Value;

pub const GENESIS: &str = include_str!("../../fixtures/genesis/ethtrace.json");

/// Number of the last block of the fixture chain
pub const CHAIN_HEAD: u64 = 100;
/// Seconds between two fixture blocks
pub const BLOCK_TIME: u64 = 12;

pub const SENDER: Address = Address::repeat_byte(0x5e);
/// `PUSH1 1 PUSH1 0 SSTORE STOP`
pub const STORER: Address = Address::repeat_byte(0xc1);
/// Calls [`STORER`] with every other argument zeroed
pub const CALLER: Address = Address::repeat_byte(0xc3);

pub fn genesis() -> Genesis {
    serde_json::from_str(GENESIS).expect("fixture genesis is valid")
}

/// Store holding the fixture chain up to [`CHAIN_HEAD`]
pub async fn setup_store() -> Store {
    let genesis = genesis();
    let timestamp = genesis.timestamp;
    let store = Store::new_from_genesis(genesis)
        .await
        .expect("Failed to store genesis");
    for number in 1..=CHAIN_HEAD {
        store
            .add_block(timestamp + number * BLOCK_TIME, &[])
            .await
            .expect("Failed to import block");
    }
    store
}

pub fn default_context_with_storage(storage: Store) -> RpcApiContext {
    RpcApiContext::new(Arc::new(Blockchain::default_with_store(storage)))
}

/// Context whose simulations go through `engine` and whose transitions reach `observer`
pub fn context_with_engine(
    storage: Store,
    engine: Arc<dyn ExecutionEngine>,
    observer: Arc<dyn TraceObserver>,
) -> RpcApiContext {
    RpcApiContext::new(Arc::new(Blockchain::new(storage, engine))).with_observer(observer)
}

pub fn rpc_request(method: &str, params: Vec<Value>) -> RpcRequest {
    RpcRequest {
        id: RpcRequestId::Number(1),
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params: Some(params),
    }
}

/// Runs calls on the bundled interpreter and counts how many times it was asked to.
#[derive(Debug, Default)]
pub struct CountingEngine {
    inner: Evm,
    runs: AtomicUsize,
    unsupported: Option<TraceType>,
}

impl CountingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine reporting `trace_type` as unavailable at every block
    pub fn without(trace_type: TraceType) -> Self {
        Self {
            unsupported: Some(trace_type),
            ..Default::default()
        }
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl ExecutionEngine for CountingEngine {
    fn run(
        &self,
        call: &CallParameters,
        header: &BlockHeader,
        state: &StateSnapshot,
        tracer: &mut dyn Tracer,
    ) -> Result<EngineOutcome, EvmError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        self.inner.run(call, header, state, tracer)
    }

    fn supports_trace_type(&self, trace_type: TraceType, _header: &BlockHeader) -> bool {
        self.unsupported != Some(trace_type)
    }
}

/// Engine that outlives any short trace timeout before giving up.
#[derive(Debug)]
pub struct StalledEngine(pub Duration);

impl ExecutionEngine for StalledEngine {
    fn run(
        &self,
        _call: &CallParameters,
        _header: &BlockHeader,
        _state: &StateSnapshot,
        _tracer: &mut dyn Tracer,
    ) -> Result<EngineOutcome, EvmError> {
        std::thread::sleep(self.0);
        Err(EvmError::Custom("stalled".to_string()))
    }
}

/// Engine whose every run panics.
#[derive(Debug)]
pub struct CrashingEngine;

impl ExecutionEngine for CrashingEngine {
    fn run(
        &self,
        _call: &CallParameters,
        _header: &BlockHeader,
        _state: &StateSnapshot,
        _tracer: &mut dyn Tracer,
    ) -> Result<EngineOutcome, EvmError> {
        panic!("engine crashed")
    }
}

/// Observer keeping every notification it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    transitions: Mutex<Vec<TraceStage>>,
    rejections: Mutex<Vec<(TraceStage, &'static str)>>,
    simulations: AtomicUsize,
}

impl RecordingObserver {
    pub fn transitions(&self) -> Vec<TraceStage> {
        self.transitions.lock().expect("poisoned").clone()
    }

    pub fn rejections(&self) -> Vec<(TraceStage, &'static str)> {
        self.rejections.lock().expect("poisoned").clone()
    }

    pub fn simulations(&self) -> usize {
        self.simulations.load(Ordering::SeqCst)
    }
}

impl TraceObserver for RecordingObserver {
    fn on_transition(&self, stage: TraceStage) {
        self.transitions.lock().expect("poisoned").push(stage);
    }

    fn on_rejection(&self, stage: TraceStage, error: &TraceCallError) {
        self.rejections
            .lock()
            .expect("poisoned")
            .push((stage, error.kind()));
    }

    fn on_simulation(&self, _elapsed: Duration) {
        self.simulations.fetch_add(1, Ordering::SeqCst);
    }
}
