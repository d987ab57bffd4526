use std::collections::BTreeMap;

use bytes::Bytes;
use ethtrace_common::{Address, H256, U256, tracing::CallType};

use crate::{
    engine::ExecutedTransaction, errors::InternalError, execution_result::ExecutionResult,
    interpreter::GeneralizedDatabase,
};

/// Hooks invoked by the interpreter while a transaction runs.
///
/// Every hook defaults to a no-op so tracers only implement what they record.
pub trait Tracer {
    /// Called before txn execution starts
    fn txn_start(&mut self, _tx: &ExecutedTransaction) {}

    /// Called when a call frame starts executing, before its first instruction.
    fn enter(&mut self, _call: &CallEnter) {}

    /// Called after every executed instruction, only if [`Tracer::traces_steps`] is true.
    fn step(&mut self, _step: &StepRecord) {}

    /// Called when a call frame finishes, after its state changes were kept or rolled back.
    fn exit(&mut self, _exit: &CallExit) -> Result<(), InternalError> {
        Ok(())
    }

    /// Called after txn execution ends, `db` holds the post-execution state.
    fn txn_end(&mut self, _gas_used: u64, _error: Option<String>, _db: &GeneralizedDatabase) {}

    fn traces_steps(&self) -> bool {
        false
    }
}

/// Channels a [`DebugTracer`] records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraceOptions {
    /// Call frame boundaries
    pub calls: bool,
    /// Every executed instruction
    pub steps: bool,
    /// Memory writes of each instruction
    pub memory: bool,
    /// Storage writes of each instruction
    pub storage: bool,
    /// Accounts touched by the transaction, before and after
    pub state: bool,
}

impl TraceOptions {
    pub fn union(self, other: TraceOptions) -> TraceOptions {
        TraceOptions {
            calls: self.calls || other.calls,
            steps: self.steps || other.steps,
            memory: self.memory || other.memory,
            storage: self.storage || other.storage,
            state: self.state || other.state,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TraceOptions::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEnter {
    pub depth: usize,
    pub call_type: CallType,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: u64,
    pub input: Bytes,
    /// Code executed by the frame, the init code for creations
    pub code: Bytes,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExit {
    pub depth: usize,
    pub gas_used: u64,
    pub output: Bytes,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub depth: usize,
    pub pc: usize,
    pub opcode: u8,
    /// Gas charged by the instruction, including gas forwarded to a sub call
    pub gas_cost: u64,
    /// Gas left in the frame once the instruction completed
    pub gas_remaining: u64,
    pub pushed: Vec<U256>,
    pub memory_write: Option<MemoryWrite>,
    pub storage_write: Option<StorageWrite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryWrite {
    pub offset: usize,
    pub data: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageWrite {
    pub key: U256,
    pub value: U256,
}

/// Account fields relevant to a state diff, storage only holds the slots that changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    pub balance: U256,
    pub nonce: u64,
    pub code: Bytes,
    pub storage: BTreeMap<H256, U256>,
}

/// A touched account, `None` on either side means the account does not exist there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDiff {
    pub address: Address,
    pub before: Option<AccountState>,
    pub after: Option<AccountState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceFrame {
    Enter(CallEnter),
    Step(StepRecord),
    Exit(CallExit),
    Account(AccountDiff),
}

/// Records the channels selected by its [`TraceOptions`] as a flat list of frames.
#[derive(Debug, Default)]
pub struct DebugTracer {
    options: TraceOptions,
    frames: Vec<TraceFrame>,
}

impl DebugTracer {
    pub fn new(options: TraceOptions) -> Self {
        Self {
            options,
            frames: Vec::new(),
        }
    }

    pub fn into_frames(self) -> Vec<TraceFrame> {
        self.frames
    }

    fn records_calls(&self) -> bool {
        self.options.calls || self.options.steps
    }
}

impl Tracer for DebugTracer {
    fn enter(&mut self, call: &CallEnter) {
        if self.records_calls() {
            self.frames.push(TraceFrame::Enter(call.clone()));
        }
    }

    fn step(&mut self, step: &StepRecord) {
        if !self.options.steps {
            return;
        }
        let mut step = step.clone();
        if !self.options.memory {
            step.memory_write = None;
        }
        if !self.options.storage {
            step.storage_write = None;
        }
        self.frames.push(TraceFrame::Step(step));
    }

    fn exit(&mut self, exit: &CallExit) -> Result<(), InternalError> {
        if self.records_calls() {
            self.frames.push(TraceFrame::Exit(exit.clone()));
        }
        Ok(())
    }

    fn txn_end(&mut self, _gas_used: u64, _error: Option<String>, db: &GeneralizedDatabase) {
        if self.options.state {
            self.frames
                .extend(db.account_diffs().into_iter().map(TraceFrame::Account));
        }
    }

    fn traces_steps(&self) -> bool {
        self.options.steps
    }
}

/// A single simulated transaction together with everything recorded while running it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionTrace {
    pub transaction: ExecutedTransaction,
    pub result: ExecutionResult,
    pub frames: Vec<TraceFrame>,
}

impl TransactionTrace {
    pub fn new(
        transaction: ExecutedTransaction,
        result: ExecutionResult,
        frames: Vec<TraceFrame>,
    ) -> Self {
        Self {
            transaction,
            result,
            frames,
        }
    }

    pub fn account_diffs(&self) -> impl Iterator<Item = &AccountDiff> {
        self.frames.iter().filter_map(|frame| match frame {
            TraceFrame::Account(diff) => Some(diff),
            _ => None,
        })
    }
}
