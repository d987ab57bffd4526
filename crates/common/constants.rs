use ethereum_types::H256;

/// keccak256 of the empty byte string, code hash of accounts without code
pub const EMPTY_KECCACK_HASH: H256 = keccak_hash::KECCAK_EMPTY;

// === Intrinsic gas ===

pub const TX_BASE_COST: u64 = 21000;
pub const TX_CREATE_COST: u64 = 32000;
pub const TX_DATA_COST_PER_ZERO: u64 = 4;
pub const TX_DATA_COST_PER_NON_ZERO: u64 = 16;

/// Deepest call frame an execution may open, the top level call has depth 0
pub const MAX_CALL_DEPTH: usize = 1024;

/// Gas limit used for genesis blocks that don't specify one
pub const DEFAULT_BLOCK_GAS_LIMIT: u64 = 30_000_000;
