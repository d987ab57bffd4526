use ethtrace_common::types::BlockNumber;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0}")]
    Custom(String),
    #[error("Missing latest block number")]
    MissingLatestBlockNumber,
    #[error("Missing earliest block number")]
    MissingEarliestBlockNumber,
    #[error("Missing state for block {0}")]
    MissingState(BlockNumber),
    #[error("Block {0} is not part of the canonical chain")]
    UnknownBlock(BlockNumber),
    #[error("Failed to lock database for writing")]
    LockError,
    #[error("Incompatible chain configuration")]
    IncompatibleChainConfig,
}
