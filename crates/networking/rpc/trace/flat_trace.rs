use bytes::Bytes;
use ethtrace_common::{Address, U256, serde_utils, tracing::CallType};
use ethtrace_vm::tracing::{CallEnter, CallExit, TraceFrame, TransactionTrace};
use serde::Serialize;

use super::errors::TraceCallError;

/// One call frame of a parity style `trace`, listed in pre-order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatTrace {
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TraceOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub subtraces: usize,
    /// Position of the frame in the call tree, as child indexes from the root
    pub trace_address: Vec<usize>,
    #[serde(rename = "type")]
    pub call_type: CallType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Action {
    Call(CallAction),
    Create(CreateAction),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAction {
    pub from: Address,
    pub call_type: CallType,
    #[serde(serialize_with = "serde_utils::u64::hex_str::serialize")]
    pub gas: u64,
    #[serde(serialize_with = "serde_utils::bytes::serialize")]
    pub input: Bytes,
    pub to: Address,
    #[serde(serialize_with = "serde_utils::u256::hex_str::serialize")]
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAction {
    pub from: Address,
    #[serde(serialize_with = "serde_utils::u64::hex_str::serialize")]
    pub gas: u64,
    #[serde(serialize_with = "serde_utils::bytes::serialize")]
    pub init: Bytes,
    #[serde(serialize_with = "serde_utils::u256::hex_str::serialize")]
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum TraceOutput {
    #[serde(rename_all = "camelCase")]
    Call {
        #[serde(serialize_with = "serde_utils::u64::hex_str::serialize")]
        gas_used: u64,
        #[serde(serialize_with = "serde_utils::bytes::serialize")]
        output: Bytes,
    },
    #[serde(rename_all = "camelCase")]
    Create {
        #[serde(serialize_with = "serde_utils::u64::hex_str::serialize")]
        gas_used: u64,
        #[serde(serialize_with = "serde_utils::bytes::serialize")]
        code: Bytes,
        address: Address,
    },
}

impl TraceOutput {
    pub fn gas_used(&self) -> u64 {
        match self {
            TraceOutput::Call { gas_used, .. } | TraceOutput::Create { gas_used, .. } => {
                *gas_used
            }
        }
    }
}

impl Action {
    fn new(enter: &CallEnter) -> Self {
        match enter.call_type {
            CallType::Call => Action::Call(CallAction {
                from: enter.from,
                call_type: enter.call_type,
                gas: enter.gas,
                input: enter.input.clone(),
                to: enter.to,
                value: enter.value,
            }),
            CallType::Create => Action::Create(CreateAction {
                from: enter.from,
                gas: enter.gas,
                init: enter.code.clone(),
                value: enter.value,
            }),
        }
    }

    pub fn gas(&self) -> u64 {
        match self {
            Action::Call(call) => call.gas,
            Action::Create(create) => create.gas,
        }
    }
}

struct OpenFrame {
    index: usize,
    address: Address,
}

/// Flattens the recorded call frames into a pre-order list.
pub fn build(trace: &TransactionTrace) -> Result<Vec<FlatTrace>, TraceCallError> {
    let mut traces: Vec<FlatTrace> = Vec::new();
    let mut open: Vec<OpenFrame> = Vec::new();
    for frame in &trace.frames {
        match frame {
            TraceFrame::Enter(enter) => {
                let trace_address = match open.last() {
                    Some(parent) => {
                        let parent = &mut traces[parent.index];
                        let mut trace_address = parent.trace_address.clone();
                        trace_address.push(parent.subtraces);
                        parent.subtraces += 1;
                        trace_address
                    }
                    None => Vec::new(),
                };
                traces.push(FlatTrace {
                    action: Action::new(enter),
                    result: None,
                    error: None,
                    subtraces: 0,
                    trace_address,
                    call_type: enter.call_type,
                });
                open.push(OpenFrame {
                    index: traces.len() - 1,
                    address: enter.to,
                });
            }
            TraceFrame::Exit(exit) => {
                let frame = open.pop().ok_or_else(|| {
                    TraceCallError::Internal("Call frame exited without being entered".to_string())
                })?;
                close(&mut traces[frame.index], exit, frame.address);
            }
            TraceFrame::Step(_) | TraceFrame::Account(_) => {}
        }
    }
    if !open.is_empty() {
        return Err(TraceCallError::Internal(
            "Call frame entered but never exited".to_string(),
        ));
    }
    Ok(traces)
}

fn close(trace: &mut FlatTrace, exit: &CallExit, address: Address) {
    if let Some(error) = &exit.error {
        trace.error = Some(error.clone());
        return;
    }
    trace.result = Some(match trace.call_type {
        CallType::Call => TraceOutput::Call {
            gas_used: exit.gas_used,
            output: exit.output.clone(),
        },
        CallType::Create => TraceOutput::Create {
            gas_used: exit.gas_used,
            code: exit.output.clone(),
            address,
        },
    });
}
