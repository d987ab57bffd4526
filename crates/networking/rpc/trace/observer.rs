use std::{sync::Arc, time::Duration};

use ethtrace_metrics::{MetricsTrace, TraceOutcome};
use tracing::{debug, error, warn};

use super::errors::TraceCallError;

/// Stages a `trace_call` request goes through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceStage {
    Received,
    Validated,
    BlockResolved,
    Simulated,
    Assembled,
    Done,
}

impl TraceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStage::Received => "received",
            TraceStage::Validated => "validated",
            TraceStage::BlockResolved => "block_resolved",
            TraceStage::Simulated => "simulated",
            TraceStage::Assembled => "assembled",
            TraceStage::Done => "done",
        }
    }
}

/// Receives the progress of every `trace_call` request.
///
/// A rejection reports the last stage the request reached before failing.
pub trait TraceObserver: Send + Sync {
    fn on_transition(&self, _stage: TraceStage) {}

    fn on_rejection(&self, _stage: TraceStage, _error: &TraceCallError) {}

    /// Time spent running the engine, reported once the simulation returned
    fn on_simulation(&self, _elapsed: Duration) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl TraceObserver for LoggingObserver {
    fn on_transition(&self, stage: TraceStage) {
        debug!(stage = stage.as_str(), "trace_call progressed");
    }

    fn on_rejection(&self, stage: TraceStage, err: &TraceCallError) {
        if err.is_client_error() {
            debug!(stage = stage.as_str(), "trace_call rejected: {err}");
        } else {
            error!(stage = stage.as_str(), "trace_call failed: {err}");
        }
    }

    fn on_simulation(&self, elapsed: Duration) {
        if elapsed > Duration::from_secs(1) {
            warn!(elapsed_ms = elapsed.as_millis() as u64, "Slow trace_call simulation");
        }
    }
}

/// Feeds the `trace_call` counters of a [`MetricsTrace`].
#[derive(Debug, Clone)]
pub struct MetricsObserver {
    metrics: MetricsTrace,
}

impl MetricsObserver {
    pub fn new(metrics: MetricsTrace) -> Self {
        Self { metrics }
    }
}

impl TraceObserver for MetricsObserver {
    fn on_transition(&self, stage: TraceStage) {
        self.metrics.record_stage(stage.as_str());
        if stage == TraceStage::Done {
            self.metrics.record_outcome(TraceOutcome::Success);
        }
    }

    fn on_rejection(&self, _stage: TraceStage, err: &TraceCallError) {
        self.metrics.record_outcome(TraceOutcome::Error(err.kind()));
    }

    fn on_simulation(&self, elapsed: Duration) {
        self.metrics.observe_simulation(elapsed.as_secs_f64());
    }
}

/// Forwards every notification to each of its observers.
#[derive(Clone, Default)]
pub struct ObserverSet(Vec<Arc<dyn TraceObserver>>);

impl ObserverSet {
    pub fn new(observers: Vec<Arc<dyn TraceObserver>>) -> Self {
        Self(observers)
    }
}

impl TraceObserver for ObserverSet {
    fn on_transition(&self, stage: TraceStage) {
        self.0.iter().for_each(|observer| observer.on_transition(stage));
    }

    fn on_rejection(&self, stage: TraceStage, err: &TraceCallError) {
        self.0
            .iter()
            .for_each(|observer| observer.on_rejection(stage, err));
    }

    fn on_simulation(&self, elapsed: Duration) {
        self.0
            .iter()
            .for_each(|observer| observer.on_simulation(elapsed));
    }
}
