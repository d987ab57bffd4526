use bytes::Bytes;
use ethtrace_blockchain::SimulationOutcome;
use ethtrace_common::{
    serde_utils,
    tracing::{TraceType, TraceTypeSet},
};
use ethtrace_storage::BlockReference;
use ethtrace_vm::tracing::TransactionTrace;
use serde::Serialize;
use tracing::error;

use super::{
    errors::TraceCallError,
    flat_trace::{self, FlatTrace},
    state_diff::{self, StateDiff},
    vm_trace::{self, VmTrace},
};

/// Response of `trace_call`, only the requested kinds are present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceCallResult {
    #[serde(serialize_with = "serde_utils::bytes::serialize")]
    pub output: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Vec<FlatTrace>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vm_trace: Option<VmTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_diff: Option<StateDiff>,
}

/// Builds every requested trace kind from the single execution in `outcome`.
pub fn assemble(
    outcome: SimulationOutcome,
    trace_types: &TraceTypeSet,
    block: &BlockReference,
) -> Result<TraceCallResult, TraceCallError> {
    let transaction_trace = match outcome {
        SimulationOutcome::Valid {
            transaction,
            result,
            frames,
        } => TransactionTrace::new(transaction, result, frames),
        SimulationOutcome::Invalid(reason) => {
            error!(
                block = block.header.number,
                "Invalid simulator result {reason}"
            );
            return Err(TraceCallError::SimulationInvalid(reason));
        }
    };

    let mut result = TraceCallResult {
        output: transaction_trace.result.output(),
        trace: None,
        vm_trace: None,
        state_diff: None,
    };
    for trace_type in trace_types {
        match trace_type {
            TraceType::Trace => result.trace = Some(flat_trace::build(&transaction_trace)?),
            TraceType::VmTrace => result.vm_trace = Some(vm_trace::build(&transaction_trace)?),
            TraceType::StateDiff => result.state_diff = Some(state_diff::build(&transaction_trace)),
        }
    }
    Ok(result)
}
