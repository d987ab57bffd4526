pub mod trace;

pub use trace::{MetricsTrace, TraceOutcome};

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("MetricsTraceError: {0}")]
    PrometheusErr(String),
    #[error("MetricsTraceError {0}")]
    FromUtf8Error(#[from] std::string::FromUtf8Error),
}

impl From<prometheus::Error> for MetricsError {
    fn from(value: prometheus::Error) -> Self {
        MetricsError::PrometheusErr(value.to_string())
    }
}
