use ethtrace_common::{
    U256,
    constants::{TX_BASE_COST, TX_CREATE_COST, TX_DATA_COST_PER_NON_ZERO, TX_DATA_COST_PER_ZERO},
};

use crate::errors::{ExceptionalHalt, VMError};

use super::memory::WORD_SIZE;

// Opcodes cost
pub const ADD: u64 = 3;
pub const MUL: u64 = 5;
pub const SUB: u64 = 3;
pub const DIV: u64 = 5;
pub const MOD: u64 = 5;
pub const LT: u64 = 3;
pub const GT: u64 = 3;
pub const EQ: u64 = 3;
pub const ISZERO: u64 = 3;
pub const AND: u64 = 3;
pub const OR: u64 = 3;
pub const XOR: u64 = 3;
pub const NOT: u64 = 3;
pub const ADDRESS: u64 = 2;
pub const BALANCE: u64 = 2600;
pub const ORIGIN: u64 = 2;
pub const CALLER: u64 = 2;
pub const CALLVALUE: u64 = 2;
pub const CALLDATALOAD: u64 = 3;
pub const CALLDATASIZE: u64 = 2;
pub const GASPRICE: u64 = 2;
pub const COINBASE: u64 = 2;
pub const TIMESTAMP: u64 = 2;
pub const NUMBER: u64 = 2;
pub const GASLIMIT: u64 = 2;
pub const SELFBALANCE: u64 = 5;
pub const BASEFEE: u64 = 2;
pub const POP: u64 = 2;
pub const MLOAD_STATIC: u64 = 3;
pub const MSTORE_STATIC: u64 = 3;
pub const SLOAD: u64 = 2100;
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 2900;
/// SSTORE fails if the frame has this much gas or less left
pub const SSTORE_STIPEND: u64 = 2300;
pub const JUMP: u64 = 8;
pub const JUMPI: u64 = 10;
pub const PC: u64 = 2;
pub const MSIZE: u64 = 2;
pub const GAS: u64 = 2;
pub const JUMPDEST: u64 = 1;
pub const PUSH0: u64 = 2;
pub const PUSHN: u64 = 3;
pub const DUPN: u64 = 3;
pub const SWAPN: u64 = 3;
pub const LOGN_STATIC: u64 = 375;
pub const LOGN_DYNAMIC_BASE: u64 = 375;
pub const LOGN_DYNAMIC_BYTE_BASE: u64 = 8;
pub const CALL_STATIC: u64 = 2600;
pub const CALL_POSITIVE_VALUE: u64 = 9000;
pub const CALL_POSITIVE_VALUE_STIPEND: u64 = 2300;
pub const CODE_DEPOSIT_COST: u64 = 200;

const MEMORY_EXPANSION_QUOTIENT: u64 = 512;

/// Gas charged for growing memory from `current_memory_size` to `new_memory_size` bytes.
pub fn memory_expansion_cost(
    new_memory_size: usize,
    current_memory_size: usize,
) -> Result<u64, VMError> {
    if new_memory_size <= current_memory_size {
        return Ok(0);
    }
    let cost = memory_cost(new_memory_size)?
        .checked_sub(memory_cost(current_memory_size)?)
        .ok_or(ExceptionalHalt::OutOfGas)?;
    Ok(cost)
}

fn memory_cost(memory_size: usize) -> Result<u64, VMError> {
    let words = u64::try_from(memory_size.div_ceil(WORD_SIZE)).map_err(|_| ExceptionalHalt::OutOfGas)?;
    words
        .checked_mul(words)
        .map(|squared| squared / MEMORY_EXPANSION_QUOTIENT)
        .and_then(|quadratic| words.checked_mul(3)?.checked_add(quadratic))
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

pub fn sstore(current_value: U256, new_value: U256) -> u64 {
    if current_value.is_zero() && !new_value.is_zero() {
        SSTORE_SET
    } else {
        SSTORE_RESET
    }
}

pub fn log(
    new_memory_size: usize,
    current_memory_size: usize,
    size: usize,
    number_of_topics: u64,
) -> Result<u64, VMError> {
    let size = u64::try_from(size).map_err(|_| ExceptionalHalt::OutOfGas)?;
    let cost = LOGN_DYNAMIC_BYTE_BASE
        .checked_mul(size)
        .and_then(|bytes_cost| {
            LOGN_DYNAMIC_BASE
                .checked_mul(number_of_topics)?
                .checked_add(bytes_cost)
        })
        .and_then(|dynamic| dynamic.checked_add(LOGN_STATIC))
        .ok_or(ExceptionalHalt::OutOfGas)?;
    cost.checked_add(memory_expansion_cost(new_memory_size, current_memory_size)?)
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

/// Static part of a `CALL`: memory expansion, account access and value transfer.
pub fn call(
    new_memory_size: usize,
    current_memory_size: usize,
    value: U256,
) -> Result<u64, VMError> {
    let value_cost = if value.is_zero() {
        0
    } else {
        CALL_POSITIVE_VALUE
    };
    memory_expansion_cost(new_memory_size, current_memory_size)?
        .checked_add(CALL_STATIC + value_cost)
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

/// Gas a `CALL` forwards: what was asked for, capped at all but one 64th of what is left.
pub fn max_message_call_gas(requested: U256, gas_left: u64) -> u64 {
    let cap = gas_left - gas_left / 64;
    if requested > U256::from(cap) {
        cap
    } else {
        requested.as_u64()
    }
}

pub fn code_deposit(code_len: usize) -> Result<u64, VMError> {
    u64::try_from(code_len)
        .ok()
        .and_then(|len| len.checked_mul(CODE_DEPOSIT_COST))
        .ok_or_else(|| ExceptionalHalt::OutOfGas.into())
}

/// Gas charged before the first instruction runs.
pub fn intrinsic_gas(calldata: &[u8], is_create: bool) -> u64 {
    let data_cost: u64 = calldata
        .iter()
        .map(|byte| {
            if *byte == 0 {
                TX_DATA_COST_PER_ZERO
            } else {
                TX_DATA_COST_PER_NON_ZERO
            }
        })
        .sum();
    let create_cost = if is_create { TX_CREATE_COST } else { 0 };
    TX_BASE_COST + create_cost + data_cost
}
