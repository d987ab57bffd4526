use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::MetricsError;

const PREFIX: &str = "ethtrace";

/// Outcome of a `trace_call` request when recording metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    Success,
    Error(&'static str),
}

impl TraceOutcome {
    fn as_label(&self) -> &'static str {
        match self {
            TraceOutcome::Success => "success",
            TraceOutcome::Error(_) => "error",
        }
    }

    fn error_kind(&self) -> &'static str {
        match self {
            TraceOutcome::Success => "",
            TraceOutcome::Error(kind) => kind,
        }
    }
}

/// Metrics of the tracing pipeline, registered in a registry owned by this instance.
#[derive(Debug, Clone)]
pub struct MetricsTrace {
    registry: Registry,
    requests: IntCounterVec,
    stages: IntCounterVec,
    simulation_duration: Histogram,
}

impl MetricsTrace {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new_custom(Some(PREFIX.to_string()), None)?;
        let requests = IntCounterVec::new(
            Opts::new(
                "trace_call_requests_total",
                "Total number of trace_call requests partitioned by outcome and error kind",
            ),
            &["outcome", "error_kind"],
        )?;
        let stages = IntCounterVec::new(
            Opts::new(
                "trace_call_stage_total",
                "Number of trace_call requests that reached each pipeline stage",
            ),
            &["stage"],
        )?;
        let simulation_duration = Histogram::with_opts(HistogramOpts::new(
            "trace_call_simulation_seconds",
            "Histogram of the time spent simulating calls",
        ))?;

        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(stages.clone()))?;
        registry.register(Box::new(simulation_duration.clone()))?;

        Ok(Self {
            registry,
            requests,
            stages,
            simulation_duration,
        })
    }

    pub fn record_outcome(&self, outcome: TraceOutcome) {
        self.requests
            .with_label_values(&[outcome.as_label(), outcome.error_kind()])
            .inc();
    }

    pub fn record_stage(&self, stage: &str) {
        self.stages.with_label_values(&[stage]).inc();
    }

    pub fn observe_simulation(&self, seconds: f64) {
        self.simulation_duration.observe(seconds);
    }

    pub fn gather_metrics(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();

        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;

        let res = String::from_utf8(buffer)?;

        Ok(res)
    }
}
