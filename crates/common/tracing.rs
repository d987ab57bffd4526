use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Trace output a `trace_call` request may ask for.
///
/// The derived ordering is the canonical output ordering: `trace`, `vmTrace`, `stateDiff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TraceType {
    /// Flat list of every call frame (parity `trace`)
    #[serde(rename = "trace")]
    Trace,
    /// Per instruction log, nested by call frame
    #[serde(rename = "vmTrace")]
    VmTrace,
    /// Pre/post values of every account touched by the call
    #[serde(rename = "stateDiff")]
    StateDiff,
}

/// Requested trace types, duplicates collapse and iteration follows the canonical order
pub type TraceTypeSet = BTreeSet<TraceType>;

impl TraceType {
    pub const ALL: [TraceType; 3] = [TraceType::Trace, TraceType::VmTrace, TraceType::StateDiff];

    pub fn as_str(&self) -> &'static str {
        match self {
            TraceType::Trace => "trace",
            TraceType::VmTrace => "vmTrace",
            TraceType::StateDiff => "stateDiff",
        }
    }
}

impl fmt::Display for TraceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Unknown trace type {0}. Supported trace types: trace, vmTrace, stateDiff")]
pub struct UnknownTraceType(pub String);

impl FromStr for TraceType {
    type Err = UnknownTraceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(TraceType::Trace),
            "vmTrace" => Ok(TraceType::VmTrace),
            "stateDiff" => Ok(TraceType::StateDiff),
            other => Err(UnknownTraceType(other.to_owned())),
        }
    }
}

/// Kind of call frame, as reported in parity style traces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallType {
    #[default]
    Call,
    Create,
}

impl CallType {
    pub fn is_create(&self) -> bool {
        matches!(self, CallType::Create)
    }
}
