use bytes::Bytes;
use ethtrace_common::{U256, serde_utils};
use ethtrace_vm::tracing::{StepRecord, TraceFrame, TransactionTrace};
use serde::{Serialize, Serializer};

use super::errors::TraceCallError;

/// Instruction log of one call frame, sub calls are nested under the instruction that made them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmTrace {
    #[serde(serialize_with = "serde_utils::bytes::serialize")]
    pub code: Bytes,
    pub ops: Vec<VmOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmOperation {
    pub cost: u64,
    pub ex: VmExecutedOperation,
    pub pc: usize,
    pub sub: Option<VmTrace>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VmExecutedOperation {
    pub mem: Option<MemoryDiff>,
    #[serde(serialize_with = "serialize_words")]
    pub push: Vec<U256>,
    pub store: Option<StorageDiff>,
    /// Gas left once the instruction ran
    pub used: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryDiff {
    #[serde(serialize_with = "serde_utils::bytes::serialize")]
    pub data: Bytes,
    pub off: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageDiff {
    #[serde(serialize_with = "serde_utils::u256::hex_str::serialize")]
    pub key: U256,
    #[serde(serialize_with = "serde_utils::u256::hex_str::serialize")]
    pub val: U256,
}

fn serialize_words<S>(words: &[U256], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(words.iter().map(|word| format!("{word:#x}")))
}

impl From<&StepRecord> for VmOperation {
    fn from(step: &StepRecord) -> Self {
        VmOperation {
            cost: step.gas_cost,
            ex: VmExecutedOperation {
                mem: step.memory_write.as_ref().map(|write| MemoryDiff {
                    data: write.data.clone(),
                    off: write.offset,
                }),
                push: step.pushed.clone(),
                store: step.storage_write.map(|write| StorageDiff {
                    key: write.key,
                    val: write.value,
                }),
                used: step.gas_remaining,
            },
            pc: step.pc,
            sub: None,
        }
    }
}

struct OpenFrame {
    code: Bytes,
    ops: Vec<VmOperation>,
    /// Trace of a sub call that returned, waiting for the instruction that made it
    returned_call: Option<VmTrace>,
}

/// Nests the recorded instructions by call frame.
///
/// A sub call is recorded before the instruction that made it completes, so its trace is
/// attached to the next instruction of the parent frame.
pub fn build(trace: &TransactionTrace) -> Result<VmTrace, TraceCallError> {
    let mut open: Vec<OpenFrame> = Vec::new();
    let mut root = None;
    for frame in &trace.frames {
        match frame {
            TraceFrame::Enter(enter) => open.push(OpenFrame {
                code: enter.code.clone(),
                ops: Vec::new(),
                returned_call: None,
            }),
            TraceFrame::Step(step) => {
                let frame = open.last_mut().ok_or_else(|| {
                    TraceCallError::Internal("Instruction recorded outside of a call".to_string())
                })?;
                let mut operation = VmOperation::from(step);
                operation.sub = frame.returned_call.take();
                frame.ops.push(operation);
            }
            TraceFrame::Exit(_) => {
                let frame = open.pop().ok_or_else(|| {
                    TraceCallError::Internal("Call frame exited without being entered".to_string())
                })?;
                let vm_trace = VmTrace {
                    code: frame.code,
                    ops: frame.ops,
                };
                match open.last_mut() {
                    Some(parent) => parent.returned_call = Some(vm_trace),
                    None => root = Some(vm_trace),
                }
            }
            TraceFrame::Account(_) => {}
        }
    }
    root.ok_or_else(|| TraceCallError::Internal("No call frame was recorded".to_string()))
}

#[cfg(test)]
mod tests {
    use ethtrace_common::{Address, tracing::CallType, types::TxKind};
    use ethtrace_vm::{
        ExecutedTransaction, ExecutionResult,
        tracing::{CallEnter, CallExit, StorageWrite},
    };
    use serde_json::json;

    use super::*;

    fn enter(depth: usize, code: &'static [u8]) -> TraceFrame {
        TraceFrame::Enter(CallEnter {
            depth,
            call_type: CallType::Call,
            from: Address::zero(),
            to: Address::zero(),
            value: U256::zero(),
            gas: 1_000,
            input: Bytes::new(),
            code: Bytes::from_static(code),
        })
    }

    fn step(depth: usize, pc: usize, opcode: u8) -> TraceFrame {
        TraceFrame::Step(StepRecord {
            depth,
            pc,
            opcode,
            gas_cost: 3,
            gas_remaining: 997,
            pushed: vec![],
            memory_write: None,
            storage_write: None,
        })
    }

    fn exit(depth: usize) -> TraceFrame {
        TraceFrame::Exit(CallExit {
            depth,
            gas_used: 3,
            output: Bytes::new(),
            error: None,
        })
    }

    fn transaction_trace(frames: Vec<TraceFrame>) -> TransactionTrace {
        TransactionTrace::new(
            ExecutedTransaction {
                from: Address::zero(),
                to: TxKind::Call(Address::zero()),
                nonce: 0,
                gas_limit: 22_000,
                gas_price: U256::zero(),
                value: U256::zero(),
                input: Bytes::new(),
            },
            ExecutionResult::Success {
                gas_used: 21_003,
                gas_refunded: 0,
                logs: vec![],
                output: Bytes::new(),
                created_address: None,
            },
            frames,
        )
    }

    #[test]
    fn sub_calls_hang_from_the_calling_instruction() {
        let trace = transaction_trace(vec![
            enter(0, &[0xf1, 0x00]),
            enter(1, &[0x00]),
            step(1, 0, 0x00),
            exit(1),
            step(0, 0, 0xf1),
            step(0, 1, 0x00),
            exit(0),
        ]);
        let vm_trace = build(&trace).unwrap();
        assert_eq!(vm_trace.code.as_ref(), &[0xf1, 0x00]);
        assert_eq!(vm_trace.ops.len(), 2);
        let sub = vm_trace.ops[0].sub.as_ref().unwrap();
        assert_eq!(sub.code.as_ref(), &[0x00]);
        assert_eq!(sub.ops.len(), 1);
        assert!(vm_trace.ops[1].sub.is_none());
    }

    #[test]
    fn serializes_like_parity() {
        let mut store = StepRecord {
            depth: 0,
            pc: 4,
            opcode: 0x55,
            gas_cost: 20_000,
            gas_remaining: 58_994,
            pushed: vec![],
            memory_write: None,
            storage_write: None,
        };
        store.storage_write = Some(StorageWrite {
            key: U256::zero(),
            value: U256::one(),
        });
        let trace = transaction_trace(vec![
            enter(0, &[0x55]),
            TraceFrame::Step(store),
            exit(0),
        ]);
        assert_eq!(
            serde_json::to_value(build(&trace).unwrap()).unwrap(),
            json!({
                "code": "0x55",
                "ops": [{
                    "cost": 20000,
                    "ex": {
                        "mem": null,
                        "push": [],
                        "store": { "key": "0x0", "val": "0x1" },
                        "used": 58994
                    },
                    "pc": 4,
                    "sub": null
                }]
            })
        );
    }

    #[test]
    fn steps_outside_a_frame_are_rejected() {
        assert!(build(&transaction_trace(vec![step(0, 0, 0x00)])).is_err());
        assert!(build(&transaction_trace(vec![])).is_err());
    }
}
