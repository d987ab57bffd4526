use ethtrace_common::types::{BlockIdentifier, BlockNumber};
use ethtrace_storage::error::StoreError;
use ethtrace_vm::EvmError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Block {0} not found")]
    BlockNotFound(BlockIdentifier),
    #[error("State of block {0} not found")]
    StateNotFound(BlockNumber),
    #[error("DB error: {0}")]
    StoreError(#[from] StoreError),
    #[error("EVM error: {0}")]
    EvmError(EvmError),
    #[error("Invalid Transaction: {0}")]
    InvalidTransaction(String),
    #[error("Tracing Timeout")]
    TracingTimeout,
    #[error("{0}")]
    Custom(String),
}

impl From<EvmError> for ChainError {
    fn from(value: EvmError) -> Self {
        match value {
            EvmError::Transaction(err) => ChainError::InvalidTransaction(err),
            other_errors => ChainError::EvmError(other_errors),
        }
    }
}

impl ChainError {
    pub fn to_metric(&self) -> &'static str {
        match self {
            ChainError::BlockNotFound(_) => "block_not_found",
            ChainError::StateNotFound(_) => "state_not_found",
            ChainError::StoreError(_) => "store_error",
            ChainError::EvmError(_) => "evm_error",
            ChainError::InvalidTransaction(_) => "invalid_transaction",
            ChainError::TracingTimeout => "tracing_timeout",
            ChainError::Custom(_) => "custom_error",
        }
    }
}
