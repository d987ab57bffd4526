mod call_frame;
mod db;
mod environment;
mod gas_cost;
mod memory;
mod opcodes;
mod vm;

pub use db::GeneralizedDatabase;

use ::tracing::debug;
use ethtrace_common::{
    U256,
    types::{BlockHeader, CallParameters},
};
use ethtrace_storage::StateSnapshot;

use crate::{
    engine::{EngineOutcome, ExecutedTransaction, ExecutionEngine},
    errors::{EvmError, TxValidationError},
    tracing::Tracer,
};
use environment::Environment;
use vm::VM;

/// Reference interpreter covering a subset of the EVM instruction set.
///
/// Supports value transfers, contract creation, storage, logs and nested `CALL`s.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evm;

impl Evm {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionEngine for Evm {
    fn run(
        &self,
        call: &CallParameters,
        header: &BlockHeader,
        state: &StateSnapshot,
        tracer: &mut dyn Tracer,
    ) -> Result<EngineOutcome, EvmError> {
        let env = Environment::new(call, header)?;
        let mut db = GeneralizedDatabase::new(state.clone());
        let from = env.origin;
        let sender = db.get_account(from).info.clone();

        let gas_limit = call.gas.unwrap_or(header.gas_limit);
        if gas_limit > header.gas_limit {
            return Err(TxValidationError::GasAllowanceExceeded {
                block_gas_limit: header.gas_limit,
                tx_gas_limit: gas_limit,
            }
            .into());
        }
        let intrinsic_gas = gas_cost::intrinsic_gas(&call.input, call.to.is_create());
        if gas_limit < intrinsic_gas {
            return Err(TxValidationError::IntrinsicGasTooLow {
                intrinsic: intrinsic_gas,
                gas_limit,
            }
            .into());
        }
        if let Some(nonce) = call.nonce {
            if nonce != sender.nonce {
                return Err(TxValidationError::NonceMismatch {
                    expected: sender.nonce,
                    actual: nonce,
                }
                .into());
            }
        }
        if sender.nonce == u64::MAX {
            return Err(TxValidationError::NonceIsMax.into());
        }
        let up_front_cost = env
            .gas_price
            .checked_mul(U256::from(gas_limit))
            .and_then(|gas_fee| gas_fee.checked_add(call.value))
            .ok_or(TxValidationError::GasPriceOverflow)?;
        if sender.balance < up_front_cost {
            return Err(TxValidationError::InsufficientAccountFunds {
                balance: sender.balance,
                required: up_front_cost,
            }
            .into());
        }

        let transaction = ExecutedTransaction {
            from,
            to: call.to,
            nonce: sender.nonce,
            gas_limit,
            gas_price: env.gas_price,
            value: call.value,
            input: call.input.clone(),
        };
        debug!(
            from = %transaction.from,
            block = header.number,
            gas_limit,
            "Executing call"
        );
        tracer.txn_start(&transaction);
        let result = VM::new(&env, &mut db, tracer).execute_transaction(&transaction, intrinsic_gas)?;
        Ok(EngineOutcome {
            transaction,
            result,
        })
    }
}
