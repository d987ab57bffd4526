use ethtrace_common::U256;
use thiserror::Error;

/// Errors surfaced by an [`ExecutionEngine`](crate::ExecutionEngine).
///
/// Reverts and halts are not errors, they are part of the [`ExecutionResult`](crate::ExecutionResult).
#[derive(Debug, Error)]
pub enum EvmError {
    #[error("Invalid Transaction: {0}")]
    Transaction(String),
    #[error("Invalid Header: {0}")]
    Header(String),
    #[error("Database access error: {0}")]
    DB(String),
    #[error("{0}")]
    Custom(String),
    #[error("Internal error: {0}")]
    Internal(#[from] InternalError),
}

impl From<TxValidationError> for EvmError {
    fn from(value: TxValidationError) -> Self {
        EvmError::Transaction(value.to_string())
    }
}

/// The call parameters can't be turned into a transaction valid at the target block
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxValidationError {
    #[error("Nonce mismatch: expected {expected}, got {actual}")]
    NonceMismatch { expected: u64, actual: u64 },
    #[error("Nonce is max")]
    NonceIsMax,
    #[error("Intrinsic gas too low: need {intrinsic}, got {gas_limit}")]
    IntrinsicGasTooLow { intrinsic: u64, gas_limit: u64 },
    #[error("Gas allowance exceeded: block gas limit {block_gas_limit}, tx gas limit {tx_gas_limit}")]
    GasAllowanceExceeded {
        block_gas_limit: u64,
        tx_gas_limit: u64,
    },
    #[error("Insufficient account funds: balance {balance}, required {required}")]
    InsufficientAccountFunds { balance: U256, required: U256 },
    #[error("Insufficient max fee per gas: max fee {max_fee}, base fee {base_fee}")]
    InsufficientMaxFeePerGas { max_fee: U256, base_fee: U256 },
    #[error("Priority fee is greater than max fee per gas")]
    PriorityGreaterThanMaxFeePerGas,
    #[error("Gas price overflow")]
    GasPriceOverflow,
}

/// Halts the current call frame, consuming all of its gas.
///
/// Display strings follow the wording of parity traces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExceptionalHalt {
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Out of stack")]
    StackOverflow,
    #[error("Out of gas")]
    OutOfGas,
    #[error("Bad jump destination")]
    InvalidJump,
    #[error("Bad instruction")]
    InvalidOpcode,
    #[error("Contract address collision")]
    AddressCollision,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("Could not pop callframe")]
    CouldNotPopCallframe,
    #[error("Arithmetic operation overflowed")]
    Overflow,
    #[error("Arithmetic operation underflowed")]
    Underflow,
    #[error("Account {0:#x} was not loaded before use")]
    AccountNotLoaded(ethtrace_common::Address),
    #[error("{0}")]
    Custom(String),
}

/// Outcome of a single opcode that stops the normal flow of the current frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    #[error("Reverted")]
    RevertOpcode,
    #[error(transparent)]
    ExceptionalHalt(#[from] ExceptionalHalt),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl VMError {
    pub fn is_revert_opcode(&self) -> bool {
        matches!(self, VMError::RevertOpcode)
    }
}
