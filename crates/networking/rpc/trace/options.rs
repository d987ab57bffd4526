use ethtrace_common::tracing::{TraceType, TraceTypeSet};
use ethtrace_vm::tracing::TraceOptions;

/// Instrumentation needed to produce every requested trace kind.
///
/// Channels shared by several kinds are only enabled once.
pub fn configure(trace_types: &TraceTypeSet) -> TraceOptions {
    trace_types
        .iter()
        .fold(TraceOptions::default(), |options, trace_type| {
            options.union(channels(*trace_type))
        })
}

fn channels(trace_type: TraceType) -> TraceOptions {
    match trace_type {
        TraceType::Trace => TraceOptions {
            calls: true,
            ..Default::default()
        },
        TraceType::VmTrace => TraceOptions {
            calls: true,
            steps: true,
            memory: true,
            storage: true,
            state: false,
        },
        TraceType::StateDiff => TraceOptions {
            state: true,
            ..Default::default()
        },
    }
}
