use ethtrace_common::{
    Address, U256,
    types::{BlockHeader, CallParameters},
};

use crate::errors::TxValidationError;

/// Block and transaction level values visible to every call frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub origin: Address,
    pub gas_price: U256,
    pub base_fee_per_gas: U256,
    pub block_number: u64,
    pub coinbase: Address,
    pub timestamp: u64,
    pub block_gas_limit: u64,
}

impl Environment {
    pub fn new(call: &CallParameters, header: &BlockHeader) -> Result<Self, TxValidationError> {
        let base_fee_per_gas = U256::from(header.base_fee_per_gas.unwrap_or_default());
        Ok(Self {
            origin: call.from.unwrap_or_default(),
            gas_price: effective_gas_price(call, base_fee_per_gas)?,
            base_fee_per_gas,
            block_number: header.number,
            coinbase: header.coinbase,
            timestamp: header.timestamp,
            block_gas_limit: header.gas_limit,
        })
    }
}

/// Price paid per unit of gas.
///
/// Calls that set no fee field at all run with a zero gas price and skip the base fee check.
fn effective_gas_price(
    call: &CallParameters,
    base_fee: U256,
) -> Result<U256, TxValidationError> {
    if call.is_eip1559() {
        let priority_fee = call.max_priority_fee_per_gas.unwrap_or_default();
        let max_fee = call
            .max_fee_per_gas
            .unwrap_or_else(|| base_fee.saturating_add(priority_fee));
        if priority_fee > max_fee {
            return Err(TxValidationError::PriorityGreaterThanMaxFeePerGas);
        }
        if max_fee < base_fee {
            return Err(TxValidationError::InsufficientMaxFeePerGas { max_fee, base_fee });
        }
        return Ok(max_fee.min(base_fee.saturating_add(priority_fee)));
    }
    match call.gas_price {
        Some(gas_price) if gas_price < base_fee => Err(TxValidationError::InsufficientMaxFeePerGas {
            max_fee: gas_price,
            base_fee,
        }),
        Some(gas_price) => Ok(gas_price),
        None => Ok(U256::zero()),
    }
}
