use bytes::Bytes;
use ethtrace_common::{
    Address, U256,
    tracing::TraceType,
    types::{BlockHeader, CallParameters, TxKind},
};
use ethtrace_storage::StateSnapshot;

use crate::{errors::EvmError, execution_result::ExecutionResult, tracing::Tracer};

/// Executes pseudo-transactions against a frozen state.
///
/// Implementations must not write to chain state: every change made while running is
/// kept in a call-local overlay that is dropped when `run` returns.
pub trait ExecutionEngine: Send + Sync + 'static {
    fn run(
        &self,
        call: &CallParameters,
        header: &BlockHeader,
        state: &StateSnapshot,
        tracer: &mut dyn Tracer,
    ) -> Result<EngineOutcome, EvmError>;

    /// Whether the engine can produce the given trace kind for a block.
    fn supports_trace_type(&self, _trace_type: TraceType, _header: &BlockHeader) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOutcome {
    pub transaction: ExecutedTransaction,
    pub result: ExecutionResult,
}

/// The call parameters with every default filled in, as the engine executed them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedTransaction {
    pub from: Address,
    pub to: TxKind,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub value: U256,
    pub input: Bytes,
}
