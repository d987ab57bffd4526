use bytes::Bytes;
use ethtrace_common::{
    Address, H256, U256,
    constants::MAX_CALL_DEPTH,
    tracing::CallType,
    types::{Log, TxKind},
    utils::{calculate_create_address, u256_to_h256},
};

use crate::{
    engine::ExecutedTransaction,
    errors::{ExceptionalHalt, InternalError, VMError},
    execution_result::ExecutionResult,
    tracing::{CallEnter, CallExit, MemoryWrite, StepRecord, StorageWrite, Tracer},
};

use super::{
    call_frame::CallFrame,
    db::GeneralizedDatabase,
    environment::Environment,
    gas_cost,
    memory::{WORD_SIZE, calculate_memory_size, to_offset, to_range},
    opcodes::Opcode,
};

pub enum OpcodeResult {
    Continue { pc_increment: usize },
    Halt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxResult {
    Success,
    Revert(VMError),
}

/// A message to be executed in a new call frame.
#[derive(Debug, Clone)]
pub struct Message {
    pub call_type: CallType,
    pub caller: Address,
    /// Recipient of the message, the new contract address for creations
    pub to: Address,
    pub value: U256,
    pub gas_limit: u64,
    /// Calldata, or init code for creations
    pub data: Bytes,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct FrameReport {
    pub result: TxResult,
    pub gas_remaining: u64,
    pub output: Bytes,
    pub logs: Vec<Log>,
}

impl FrameReport {
    pub fn is_success(&self) -> bool {
        self.result == TxResult::Success
    }
}

/// Side effects of a single instruction that tracers may want to see.
#[derive(Debug, Default)]
struct StepEffect {
    /// Overrides the gas cost derived from the frame's remaining gas
    gas_cost: Option<u64>,
    memory_write: Option<MemoryWrite>,
    storage_write: Option<StorageWrite>,
}

pub struct VM<'a> {
    env: &'a Environment,
    db: &'a mut GeneralizedDatabase,
    tracer: &'a mut dyn Tracer,
    trace_steps: bool,
}

impl<'a> VM<'a> {
    pub fn new(
        env: &'a Environment,
        db: &'a mut GeneralizedDatabase,
        tracer: &'a mut dyn Tracer,
    ) -> Self {
        let trace_steps = tracer.traces_steps();
        Self {
            env,
            db,
            tracer,
            trace_steps,
        }
    }

    /// Runs an already validated transaction.
    ///
    /// The sender pays for the whole gas limit up front and gets the unused gas back at the
    /// end. Fee payment and nonce increase survive a failed execution.
    pub fn execute_transaction(
        &mut self,
        tx: &ExecutedTransaction,
        intrinsic_gas: u64,
    ) -> Result<ExecutionResult, InternalError> {
        let gas_fee = mul_gas(tx.gas_price, tx.gas_limit)?;
        let sender = self.db.get_account_mut(tx.from);
        sender.info.balance = sender
            .info
            .balance
            .checked_sub(gas_fee)
            .ok_or(InternalError::Underflow)?;
        sender.info.nonce = sender
            .info
            .nonce
            .checked_add(1)
            .ok_or(InternalError::Overflow)?;

        let (call_type, to) = match tx.to {
            TxKind::Call(address) => (CallType::Call, address),
            TxKind::Create => (
                CallType::Create,
                calculate_create_address(tx.from, tx.nonce),
            ),
        };
        let report = self.execute_message(Message {
            call_type,
            caller: tx.from,
            to,
            value: tx.value,
            gas_limit: tx
                .gas_limit
                .checked_sub(intrinsic_gas)
                .ok_or(InternalError::Underflow)?,
            data: tx.input.clone(),
            depth: 0,
        })?;

        let gas_used = tx
            .gas_limit
            .checked_sub(report.gas_remaining)
            .ok_or(InternalError::Underflow)?;
        self.add_balance(tx.from, mul_gas(tx.gas_price, report.gas_remaining)?)?;
        let priority_fee = tx.gas_price.saturating_sub(self.env.base_fee_per_gas);
        let tip = mul_gas(priority_fee, gas_used)?;
        if !tip.is_zero() {
            self.add_balance(self.env.coinbase, tip)?;
        }

        let result = match report.result {
            TxResult::Success => ExecutionResult::Success {
                gas_used,
                gas_refunded: 0,
                logs: report.logs,
                output: report.output,
                created_address: call_type.is_create().then_some(to),
            },
            TxResult::Revert(error) if error.is_revert_opcode() => ExecutionResult::Revert {
                gas_used,
                output: report.output,
            },
            TxResult::Revert(error) => ExecutionResult::Halt {
                reason: error.to_string(),
                gas_used,
            },
        };
        self.tracer.txn_end(gas_used, result.error(), &*self.db);
        Ok(result)
    }

    /// Executes `msg` in a new call frame, rolling back its state changes if it fails.
    pub fn execute_message(&mut self, msg: Message) -> Result<FrameReport, InternalError> {
        let backup = self.db.backup();
        let (calldata, bytecode) = match msg.call_type {
            CallType::Call => (msg.data.clone(), self.db.code(msg.to)),
            CallType::Create => (Bytes::new(), msg.data.clone()),
        };
        self.tracer.enter(&CallEnter {
            depth: msg.depth,
            call_type: msg.call_type,
            from: msg.caller,
            to: msg.to,
            value: msg.value,
            gas: msg.gas_limit,
            input: msg.data.clone(),
            code: bytecode.clone(),
        });

        let mut frame = CallFrame::new(
            msg.depth,
            msg.call_type,
            msg.caller,
            msg.to,
            msg.value,
            msg.gas_limit,
            calldata,
            bytecode,
        );
        let outcome = self.run_message(&mut frame);

        let result = match outcome {
            Ok(()) => TxResult::Success,
            Err(VMError::Internal(error)) => return Err(error),
            Err(error) => {
                self.db.restore(backup);
                frame.logs.clear();
                if !error.is_revert_opcode() {
                    frame.gas_remaining = 0;
                    frame.output = Bytes::new();
                }
                TxResult::Revert(error)
            }
        };

        let error = match &result {
            TxResult::Success => None,
            TxResult::Revert(error) => Some(error.to_string()),
        };
        self.tracer.exit(&CallExit {
            depth: frame.depth,
            gas_used: frame.gas_used(),
            output: frame.output.clone(),
            error,
        })?;

        Ok(FrameReport {
            result,
            gas_remaining: frame.gas_remaining,
            output: frame.output,
            logs: frame.logs,
        })
    }

    fn run_message(&mut self, frame: &mut CallFrame) -> Result<(), VMError> {
        if frame.call_type.is_create() {
            let account = self.db.get_account(frame.to);
            if account.has_code() || account.info.nonce != 0 {
                return Err(ExceptionalHalt::AddressCollision.into());
            }
            self.db.get_account_mut(frame.to).info.nonce = 1;
        }
        self.transfer(frame.msg_sender, frame.to, frame.msg_value)?;

        if !frame.bytecode.is_empty() {
            self.run_execution(frame)?;
        }

        if frame.call_type.is_create() {
            frame.increase_consumed_gas(gas_cost::code_deposit(frame.output.len())?)?;
            self.db
                .get_account_mut(frame.to)
                .set_code(frame.output.clone());
        }
        Ok(())
    }

    /// Main execution loop of a call frame
    fn run_execution(&mut self, frame: &mut CallFrame) -> Result<(), VMError> {
        loop {
            let pc = frame.pc;
            let opcode = frame.next_opcode();
            let gas_before = frame.gas_remaining;
            let mut effect = StepEffect::default();

            let result = self.execute_opcode(opcode, frame, &mut effect);
            let record_step = match &result {
                Ok(_) => true,
                Err(error) => error.is_revert_opcode(),
            };
            if self.trace_steps && record_step {
                self.tracer.step(&StepRecord {
                    depth: frame.depth,
                    pc,
                    opcode: opcode.into(),
                    gas_cost: effect
                        .gas_cost
                        .unwrap_or(gas_before.saturating_sub(frame.gas_remaining)),
                    gas_remaining: frame.gas_remaining,
                    pushed: frame.stack.top(pushed_items(opcode)),
                    memory_write: effect.memory_write,
                    storage_write: effect.storage_write,
                });
            }

            match result? {
                OpcodeResult::Continue { pc_increment } => frame.pc += pc_increment,
                OpcodeResult::Halt => return Ok(()),
            }
        }
    }

    fn execute_opcode(
        &mut self,
        opcode: Opcode,
        frame: &mut CallFrame,
        effect: &mut StepEffect,
    ) -> Result<OpcodeResult, VMError> {
        use Opcode::*;

        let next = OpcodeResult::Continue { pc_increment: 1 };
        match opcode {
            STOP => return Ok(OpcodeResult::Halt),
            ADD => binary_op(frame, gas_cost::ADD, |a, b| a.overflowing_add(b).0)?,
            MUL => binary_op(frame, gas_cost::MUL, |a, b| a.overflowing_mul(b).0)?,
            SUB => binary_op(frame, gas_cost::SUB, |a, b| a.overflowing_sub(b).0)?,
            DIV => binary_op(frame, gas_cost::DIV, |a, b| a.checked_div(b).unwrap_or_default())?,
            MOD => binary_op(frame, gas_cost::MOD, |a, b| a.checked_rem(b).unwrap_or_default())?,
            LT => binary_op(frame, gas_cost::LT, |a, b| U256::from(u8::from(a < b)))?,
            GT => binary_op(frame, gas_cost::GT, |a, b| U256::from(u8::from(a > b)))?,
            EQ => binary_op(frame, gas_cost::EQ, |a, b| U256::from(u8::from(a == b)))?,
            AND => binary_op(frame, gas_cost::AND, |a, b| a & b)?,
            OR => binary_op(frame, gas_cost::OR, |a, b| a | b)?,
            XOR => binary_op(frame, gas_cost::XOR, |a, b| a ^ b)?,
            ISZERO => {
                frame.increase_consumed_gas(gas_cost::ISZERO)?;
                let value = frame.stack.pop()?;
                frame.stack.push(U256::from(u8::from(value.is_zero())))?;
            }
            NOT => {
                frame.increase_consumed_gas(gas_cost::NOT)?;
                let value = frame.stack.pop()?;
                frame.stack.push(!value)?;
            }

            ADDRESS => push_word(frame, gas_cost::ADDRESS, address_to_word(frame.to))?,
            BALANCE => {
                frame.increase_consumed_gas(gas_cost::BALANCE)?;
                let address = word_to_address(frame.stack.pop()?);
                let balance = self.db.balance(address);
                frame.stack.push(balance)?;
            }
            ORIGIN => push_word(frame, gas_cost::ORIGIN, address_to_word(self.env.origin))?,
            CALLER => push_word(frame, gas_cost::CALLER, address_to_word(frame.msg_sender))?,
            CALLVALUE => push_word(frame, gas_cost::CALLVALUE, frame.msg_value)?,
            CALLDATALOAD => {
                frame.increase_consumed_gas(gas_cost::CALLDATALOAD)?;
                let offset = frame.stack.pop()?;
                let mut word = [0u8; WORD_SIZE];
                if offset < U256::from(frame.calldata.len()) {
                    let offset = offset.as_usize();
                    let end = (offset + WORD_SIZE).min(frame.calldata.len());
                    word[..end - offset].copy_from_slice(&frame.calldata[offset..end]);
                }
                frame.stack.push(U256::from_big_endian(&word))?;
            }
            CALLDATASIZE => push_word(
                frame,
                gas_cost::CALLDATASIZE,
                U256::from(frame.calldata.len()),
            )?,
            GASPRICE => push_word(frame, gas_cost::GASPRICE, self.env.gas_price)?,

            COINBASE => push_word(frame, gas_cost::COINBASE, address_to_word(self.env.coinbase))?,
            TIMESTAMP => push_word(frame, gas_cost::TIMESTAMP, U256::from(self.env.timestamp))?,
            NUMBER => push_word(frame, gas_cost::NUMBER, U256::from(self.env.block_number))?,
            GASLIMIT => push_word(
                frame,
                gas_cost::GASLIMIT,
                U256::from(self.env.block_gas_limit),
            )?,
            SELFBALANCE => {
                let balance = self.db.balance(frame.to);
                push_word(frame, gas_cost::SELFBALANCE, balance)?;
            }
            BASEFEE => push_word(frame, gas_cost::BASEFEE, self.env.base_fee_per_gas)?,

            POP => {
                frame.increase_consumed_gas(gas_cost::POP)?;
                frame.stack.pop()?;
            }
            MLOAD => {
                let offset = to_offset(frame.stack.pop()?)?;
                let new_memory_size = calculate_memory_size(offset, WORD_SIZE, frame.memory.len())?;
                frame.increase_consumed_gas(
                    gas_cost::MLOAD_STATIC
                        + gas_cost::memory_expansion_cost(new_memory_size, frame.memory.len())?,
                )?;
                let value = frame.memory.load_word(offset);
                frame.stack.push(value)?;
            }
            MSTORE => {
                let offset = to_offset(frame.stack.pop()?)?;
                let value = frame.stack.pop()?;
                let new_memory_size = calculate_memory_size(offset, WORD_SIZE, frame.memory.len())?;
                frame.increase_consumed_gas(
                    gas_cost::MSTORE_STATIC
                        + gas_cost::memory_expansion_cost(new_memory_size, frame.memory.len())?,
                )?;
                frame.memory.store_word(offset, value);
                effect.memory_write = Some(MemoryWrite {
                    offset,
                    data: Bytes::copy_from_slice(&value.to_big_endian()),
                });
            }
            SLOAD => {
                frame.increase_consumed_gas(gas_cost::SLOAD)?;
                let key = u256_to_h256(frame.stack.pop()?);
                let value = self.db.storage_slot(frame.to, key);
                frame.stack.push(value)?;
            }
            SSTORE => {
                if frame.gas_remaining <= gas_cost::SSTORE_STIPEND {
                    return Err(ExceptionalHalt::OutOfGas.into());
                }
                let key = frame.stack.pop()?;
                let value = frame.stack.pop()?;
                let slot = u256_to_h256(key);
                let current = self.db.storage_slot(frame.to, slot);
                frame.increase_consumed_gas(gas_cost::sstore(current, value))?;
                self.db.set_storage_slot(frame.to, slot, value);
                effect.storage_write = Some(StorageWrite { key, value });
            }
            JUMP => {
                frame.increase_consumed_gas(gas_cost::JUMP)?;
                let destination = frame.stack.pop()?;
                return jump(frame, destination);
            }
            JUMPI => {
                frame.increase_consumed_gas(gas_cost::JUMPI)?;
                let destination = frame.stack.pop()?;
                let condition = frame.stack.pop()?;
                if !condition.is_zero() {
                    return jump(frame, destination);
                }
            }
            PC => push_word(frame, gas_cost::PC, U256::from(frame.pc))?,
            MSIZE => push_word(frame, gas_cost::MSIZE, U256::from(frame.memory.len()))?,
            GAS => {
                frame.increase_consumed_gas(gas_cost::GAS)?;
                frame.stack.push(U256::from(frame.gas_remaining))?;
            }
            JUMPDEST => frame.increase_consumed_gas(gas_cost::JUMPDEST)?,

            PUSH0 => push_word(frame, gas_cost::PUSH0, U256::zero())?,
            DUP1 | DUP2 | DUP3 | DUP4 | DUP5 | DUP6 | DUP7 | DUP8 | DUP9 | DUP10 | DUP11
            | DUP12 | DUP13 | DUP14 | DUP15 | DUP16 => {
                frame.increase_consumed_gas(gas_cost::DUPN)?;
                let depth = usize::from(u8::from(opcode) - u8::from(DUP1));
                let value = frame.stack.peek(depth)?;
                frame.stack.push(value)?;
            }
            SWAP1 | SWAP2 | SWAP3 | SWAP4 | SWAP5 | SWAP6 | SWAP7 | SWAP8 | SWAP9 | SWAP10
            | SWAP11 | SWAP12 | SWAP13 | SWAP14 | SWAP15 | SWAP16 => {
                frame.increase_consumed_gas(gas_cost::SWAPN)?;
                let depth = usize::from(u8::from(opcode) - u8::from(SWAP1)) + 1;
                frame.stack.swap(depth)?;
            }
            LOG0 | LOG1 | LOG2 | LOG3 | LOG4 => {
                let number_of_topics = u8::from(opcode) - u8::from(LOG0);
                self.op_log(frame, number_of_topics)?;
            }

            CALL => self.op_call(frame, effect)?,
            RETURN => {
                frame.output = return_data(frame)?;
                return Ok(OpcodeResult::Halt);
            }
            REVERT => {
                frame.output = return_data(frame)?;
                return Err(VMError::RevertOpcode);
            }
            INVALID => return Err(ExceptionalHalt::InvalidOpcode.into()),

            // PUSH1..PUSH32
            _ => {
                frame.increase_consumed_gas(gas_cost::PUSHN)?;
                let size = opcode.push_size();
                let value = frame.push_value(size);
                frame.stack.push(value)?;
                return Ok(OpcodeResult::Continue {
                    pc_increment: size + 1,
                });
            }
        }
        Ok(next)
    }

    fn op_log(&mut self, frame: &mut CallFrame, number_of_topics: u8) -> Result<(), VMError> {
        let offset = frame.stack.pop()?;
        let size = frame.stack.pop()?;
        let (offset, size) = to_range(offset, size)?;
        let mut topics = Vec::with_capacity(usize::from(number_of_topics));
        for _ in 0..number_of_topics {
            topics.push(u256_to_h256(frame.stack.pop()?));
        }
        let new_memory_size = calculate_memory_size(offset, size, frame.memory.len())?;
        frame.increase_consumed_gas(gas_cost::log(
            new_memory_size,
            frame.memory.len(),
            size,
            u64::from(number_of_topics),
        )?)?;
        let data = frame.memory.load_range(offset, size);
        frame.logs.push(Log {
            address: frame.to,
            topics,
            data,
        });
        Ok(())
    }

    fn op_call(&mut self, frame: &mut CallFrame, effect: &mut StepEffect) -> Result<(), VMError> {
        let requested_gas = frame.stack.pop()?;
        let to = word_to_address(frame.stack.pop()?);
        let value = frame.stack.pop()?;
        let args_offset = frame.stack.pop()?;
        let args_size = frame.stack.pop()?;
        let (args_offset, args_size) = to_range(args_offset, args_size)?;
        let return_offset = frame.stack.pop()?;
        let return_size = frame.stack.pop()?;
        let (return_offset, return_size) = to_range(return_offset, return_size)?;

        let current_memory_size = frame.memory.len();
        let new_memory_size = calculate_memory_size(args_offset, args_size, current_memory_size)?;
        let new_memory_size = calculate_memory_size(return_offset, return_size, new_memory_size)?;
        let static_cost = gas_cost::call(new_memory_size, current_memory_size, value)?;
        frame.increase_consumed_gas(static_cost)?;
        frame.memory.expand(new_memory_size);

        let forwarded_gas = gas_cost::max_message_call_gas(requested_gas, frame.gas_remaining);
        frame.increase_consumed_gas(forwarded_gas)?;
        effect.gas_cost = Some(static_cost + forwarded_gas);

        let depth = frame.depth + 1;
        if depth > MAX_CALL_DEPTH || self.db.balance(frame.to) < value {
            frame.gas_remaining += forwarded_gas;
            frame.stack.push(U256::zero())?;
            return Ok(());
        }

        let stipend = if value.is_zero() {
            0
        } else {
            gas_cost::CALL_POSITIVE_VALUE_STIPEND
        };
        let calldata = frame.memory.load_range(args_offset, args_size);
        let report = self.execute_message(Message {
            call_type: CallType::Call,
            caller: frame.to,
            to,
            value,
            gas_limit: forwarded_gas + stipend,
            data: calldata,
            depth,
        })?;

        frame.gas_remaining = frame
            .gas_remaining
            .checked_add(report.gas_remaining)
            .ok_or(InternalError::Overflow)?;
        let written = report.output.len().min(return_size);
        if written > 0 {
            let data = report.output.slice(..written);
            frame.memory.store_data(return_offset, &data);
            effect.memory_write = Some(MemoryWrite {
                offset: return_offset,
                data,
            });
        }
        let success = report.is_success();
        if success {
            frame.logs.extend(report.logs);
        }
        frame.stack.push(U256::from(u8::from(success)))?;
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, value: U256) -> Result<(), VMError> {
        if value.is_zero() {
            // Still touches the recipient
            self.db.get_account(to);
            return Ok(());
        }
        let sender = self.db.get_account_mut(from);
        sender.info.balance = sender
            .info
            .balance
            .checked_sub(value)
            .ok_or(InternalError::Underflow)?;
        self.add_balance(to, value)?;
        Ok(())
    }

    fn add_balance(&mut self, address: Address, value: U256) -> Result<(), InternalError> {
        let account = self.db.get_account_mut(address);
        account.info.balance = account
            .info
            .balance
            .checked_add(value)
            .ok_or(InternalError::Overflow)?;
        Ok(())
    }
}

fn binary_op(
    frame: &mut CallFrame,
    gas: u64,
    op: impl FnOnce(U256, U256) -> U256,
) -> Result<(), VMError> {
    frame.increase_consumed_gas(gas)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(op(a, b))
}

fn push_word(frame: &mut CallFrame, gas: u64, value: U256) -> Result<(), VMError> {
    frame.increase_consumed_gas(gas)?;
    frame.stack.push(value)
}

fn jump(frame: &mut CallFrame, destination: U256) -> Result<OpcodeResult, VMError> {
    if !frame.is_valid_jump(destination) {
        return Err(ExceptionalHalt::InvalidJump.into());
    }
    frame.pc = destination.as_usize();
    Ok(OpcodeResult::Continue { pc_increment: 0 })
}

fn return_data(frame: &mut CallFrame) -> Result<Bytes, VMError> {
    let offset = frame.stack.pop()?;
    let size = frame.stack.pop()?;
    let (offset, size) = to_range(offset, size)?;
    let new_memory_size = calculate_memory_size(offset, size, frame.memory.len())?;
    frame.increase_consumed_gas(gas_cost::memory_expansion_cost(
        new_memory_size,
        frame.memory.len(),
    )?)?;
    Ok(frame.memory.load_range(offset, size))
}

/// Number of stack items an instruction leaves for tracers to report
fn pushed_items(opcode: Opcode) -> usize {
    use Opcode::*;

    let byte = u8::from(opcode);
    match opcode {
        STOP | POP | MSTORE | SSTORE | JUMP | JUMPI | JUMPDEST | LOG0 | LOG1 | LOG2 | LOG3
        | LOG4 | RETURN | REVERT | INVALID => 0,
        _ if (u8::from(DUP1)..=u8::from(DUP16)).contains(&byte) => {
            usize::from(byte - u8::from(DUP1)) + 2
        }
        _ if (u8::from(SWAP1)..=u8::from(SWAP16)).contains(&byte) => {
            usize::from(byte - u8::from(SWAP1)) + 2
        }
        _ => 1,
    }
}

fn word_to_address(word: U256) -> Address {
    Address::from_slice(&word.to_big_endian()[12..])
}

fn address_to_word(address: Address) -> U256 {
    U256::from_big_endian(H256::from(address).as_bytes())
}

fn mul_gas(price: U256, gas: u64) -> Result<U256, InternalError> {
    price
        .checked_mul(U256::from(gas))
        .ok_or(InternalError::Overflow)
}
