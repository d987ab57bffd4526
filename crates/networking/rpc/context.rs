use std::{sync::Arc, time::Duration};

use ethtrace_blockchain::Blockchain;
use ethtrace_storage::Store;

use crate::trace::observer::{LoggingObserver, TraceObserver};

pub const DEFAULT_TRACE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct RpcApiContext {
    pub storage: Store,
    pub blockchain: Arc<Blockchain>,
    /// Notified at every `trace_call` pipeline transition
    pub observer: Arc<dyn TraceObserver>,
    pub trace_timeout: Duration,
}

impl RpcApiContext {
    pub fn new(blockchain: Arc<Blockchain>) -> Self {
        Self {
            storage: blockchain.storage().clone(),
            blockchain,
            observer: Arc::new(LoggingObserver),
            trace_timeout: DEFAULT_TRACE_TIMEOUT,
        }
    }

    pub fn with_observer(self, observer: Arc<dyn TraceObserver>) -> Self {
        Self { observer, ..self }
    }

    pub fn with_trace_timeout(self, trace_timeout: Duration) -> Self {
        Self {
            trace_timeout,
            ..self
        }
    }
}
