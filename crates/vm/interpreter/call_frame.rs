use bytes::Bytes;
use ethtrace_common::{Address, U256, tracing::CallType, types::Log};

use crate::errors::{ExceptionalHalt, VMError};

use super::{memory::Memory, opcodes::Opcode};

pub const STACK_LIMIT: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<U256>,
}

impl Stack {
    pub fn pop(&mut self) -> Result<U256, VMError> {
        self.values
            .pop()
            .ok_or_else(|| ExceptionalHalt::StackUnderflow.into())
    }

    pub fn push(&mut self, value: U256) -> Result<(), VMError> {
        if self.values.len() >= STACK_LIMIT {
            return Err(ExceptionalHalt::StackOverflow.into());
        }
        self.values.push(value);
        Ok(())
    }

    /// Value `depth` positions below the top, 0 being the top
    pub fn peek(&self, depth: usize) -> Result<U256, VMError> {
        self.values
            .len()
            .checked_sub(depth + 1)
            .and_then(|index| self.values.get(index))
            .copied()
            .ok_or_else(|| ExceptionalHalt::StackUnderflow.into())
    }

    pub fn swap(&mut self, depth: usize) -> Result<(), VMError> {
        let top = self
            .values
            .len()
            .checked_sub(1)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        let other = top
            .checked_sub(depth)
            .ok_or(ExceptionalHalt::StackUnderflow)?;
        self.values.swap(top, other);
        Ok(())
    }

    /// The `count` topmost values, bottom to top
    pub fn top(&self, count: usize) -> Vec<U256> {
        let start = self.values.len().saturating_sub(count);
        self.values[start..].to_vec()
    }
}

/// Execution context of a single message call.
#[derive(Debug, Clone)]
pub struct CallFrame {
    pub depth: usize,
    pub call_type: CallType,
    /// Address of the account that sent the message
    pub msg_sender: Address,
    /// Address of the account whose code is being executed
    pub to: Address,
    pub msg_value: U256,
    pub gas_limit: u64,
    pub gas_remaining: u64,
    pub calldata: Bytes,
    pub bytecode: Bytes,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub logs: Vec<Log>,
    /// Data returned by `RETURN` or `REVERT`
    pub output: Bytes,
    jump_destinations: Vec<bool>,
}

impl CallFrame {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        depth: usize,
        call_type: CallType,
        msg_sender: Address,
        to: Address,
        msg_value: U256,
        gas_limit: u64,
        calldata: Bytes,
        bytecode: Bytes,
    ) -> Self {
        let jump_destinations = valid_jump_destinations(&bytecode);
        Self {
            depth,
            call_type,
            msg_sender,
            to,
            msg_value,
            gas_limit,
            gas_remaining: gas_limit,
            calldata,
            bytecode,
            pc: 0,
            stack: Stack::default(),
            memory: Memory::default(),
            logs: Vec::new(),
            output: Bytes::new(),
            jump_destinations,
        }
    }

    /// Running past the end of the code behaves as `STOP`
    pub fn next_opcode(&self) -> Opcode {
        self.bytecode
            .get(self.pc)
            .copied()
            .map(Opcode::from)
            .unwrap_or(Opcode::STOP)
    }

    pub fn increase_consumed_gas(&mut self, gas: u64) -> Result<(), VMError> {
        self.gas_remaining = self
            .gas_remaining
            .checked_sub(gas)
            .ok_or(ExceptionalHalt::OutOfGas)?;
        Ok(())
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_remaining)
    }

    pub fn is_valid_jump(&self, destination: U256) -> bool {
        destination < U256::from(self.jump_destinations.len())
            && self.jump_destinations[destination.as_usize()]
    }

    /// Immediate value of the `PUSHn` at the current pc, zero padded past the end of the code
    pub fn push_value(&self, size: usize) -> U256 {
        let mut word = [0u8; 32];
        let start = (self.pc + 1).min(self.bytecode.len());
        let end = (self.pc + 1 + size).min(self.bytecode.len());
        let available = &self.bytecode[start..end];
        word[32 - size..32 - size + available.len()].copy_from_slice(available);
        U256::from_big_endian(&word)
    }
}

fn valid_jump_destinations(bytecode: &[u8]) -> Vec<bool> {
    let mut destinations = vec![false; bytecode.len()];
    let mut pc = 0;
    while let Some(byte) = bytecode.get(pc) {
        let opcode = Opcode::from(*byte);
        if opcode == Opcode::JUMPDEST {
            destinations[pc] = true;
        }
        pc += 1 + opcode.push_size();
    }
    destinations
}
