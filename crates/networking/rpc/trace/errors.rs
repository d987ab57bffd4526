use ethtrace_blockchain::error::ChainError;

use crate::rpc_types::RpcErr;

/// Ways a `trace_call` request can fail, every one of them ends the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TraceCallError {
    #[error("Malformed call parameters: {0}")]
    MalformedCallParameters(String),
    #[error("Unsupported trace kind: {0}")]
    UnsupportedTraceKind(String),
    #[error("Block {0} not found")]
    BlockNotFound(String),
    #[error("Invalid simulator result: {0}")]
    SimulationInvalid(String),
    #[error("{0}")]
    Internal(String),
}

impl TraceCallError {
    /// Label used when recording the error in metrics
    pub fn kind(&self) -> &'static str {
        match self {
            TraceCallError::MalformedCallParameters(_) => "malformed_call_parameters",
            TraceCallError::UnsupportedTraceKind(_) => "unsupported_trace_kind",
            TraceCallError::BlockNotFound(_) => "block_not_found",
            TraceCallError::SimulationInvalid(_) => "simulation_invalid",
            TraceCallError::Internal(_) => "internal",
        }
    }

    /// Whether the request itself was at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TraceCallError::MalformedCallParameters(_)
                | TraceCallError::UnsupportedTraceKind(_)
                | TraceCallError::BlockNotFound(_)
        )
    }
}

impl From<ChainError> for TraceCallError {
    fn from(value: ChainError) -> Self {
        match value {
            ChainError::BlockNotFound(block) => TraceCallError::BlockNotFound(block.to_string()),
            ChainError::InvalidTransaction(reason) => TraceCallError::SimulationInvalid(reason),
            other => TraceCallError::Internal(other.to_string()),
        }
    }
}

impl From<TraceCallError> for RpcErr {
    fn from(value: TraceCallError) -> Self {
        match value {
            TraceCallError::MalformedCallParameters(_) | TraceCallError::UnsupportedTraceKind(_) => {
                RpcErr::BadParams(value.to_string())
            }
            TraceCallError::BlockNotFound(block) => RpcErr::BlockNotFound(block),
            // The engine refusing a call is not something the client can fix
            TraceCallError::SimulationInvalid(_) | TraceCallError::Internal(_) => {
                RpcErr::Internal(value.to_string())
            }
        }
    }
}
