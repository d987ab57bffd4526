use std::time::Duration;

use ::tracing::debug;
use ethtrace_common::types::{BlockIdentifier, CallParameters};
use ethtrace_storage::{BlockReference, ChainStateLookup};
use ethtrace_vm::{
    EngineOutcome, EvmError, ExecutedTransaction, ExecutionResult,
    tracing::{DebugTracer, TraceFrame, TraceOptions, TransactionTrace},
};

use crate::{Blockchain, error::ChainError};

/// Result of simulating a call, tells apart calls that ran from calls the engine refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationOutcome {
    /// The call executed, `result` may still be a revert or a halt
    Valid {
        transaction: ExecutedTransaction,
        result: ExecutionResult,
        frames: Vec<TraceFrame>,
    },
    /// The call could not be turned into a valid transaction
    Invalid(String),
}

impl SimulationOutcome {
    pub fn into_transaction_trace(self) -> Option<TransactionTrace> {
        match self {
            SimulationOutcome::Valid {
                transaction,
                result,
                frames,
            } => Some(TransactionTrace::new(transaction, result, frames)),
            SimulationOutcome::Invalid(_) => None,
        }
    }
}

impl Blockchain {
    /// Resolves `block` into its header and the state it left behind.
    pub fn resolve_block(&self, block: &BlockIdentifier) -> Result<BlockReference, ChainError> {
        resolve_block(self.storage(), block)
    }

    /// Simulates `call` on top of the state of `block`, recording the channels in `options`.
    ///
    /// The engine runs on a blocking worker, waiting for it is abandoned after `timeout`.
    pub async fn simulate_call(
        &self,
        call: CallParameters,
        options: TraceOptions,
        block: BlockReference,
        timeout: Duration,
    ) -> Result<SimulationOutcome, ChainError> {
        let engine = self.engine.clone();
        debug!(block = block.header.number, "Simulating call");
        timeout_trace_operation(timeout, move || {
            let mut tracer = DebugTracer::new(options);
            match engine.run(&call, &block.header, &block.state, &mut tracer) {
                Ok(EngineOutcome {
                    transaction,
                    result,
                }) => Ok(SimulationOutcome::Valid {
                    transaction,
                    result,
                    frames: tracer.into_frames(),
                }),
                Err(EvmError::Transaction(reason)) => Ok(SimulationOutcome::Invalid(reason)),
                Err(err) => Err(err),
            }
        })
        .await
    }
}

/// Looks up the header for `block` and the state snapshot attached to it.
pub fn resolve_block(
    lookup: &dyn ChainStateLookup,
    block: &BlockIdentifier,
) -> Result<BlockReference, ChainError> {
    let Some(header) = lookup.resolve_header(block)? else {
        return Err(ChainError::BlockNotFound(*block));
    };
    let Some(state) = lookup.state_snapshot_at(&header)? else {
        return Err(ChainError::StateNotFound(header.number));
    };
    Ok(BlockReference { header, state })
}

/// Runs the given evm trace operation, aborting if it takes more than the time given by `timeout`
async fn timeout_trace_operation<O, T>(timeout: Duration, operation: O) -> Result<T, ChainError>
where
    O: FnOnce() -> Result<T, EvmError> + Send + 'static,
    T: Send + 'static,
{
    Ok(
        tokio::time::timeout(timeout, tokio::task::spawn_blocking(operation))
            .await
            .map_err(|_| ChainError::TracingTimeout)?
            .map_err(|_| ChainError::Custom("Unexpected Runtime Error".to_string()))??,
    )
}
