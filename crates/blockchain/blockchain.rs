pub mod error;
pub mod tracing;

use std::sync::Arc;

use ethtrace_common::{tracing::TraceType, types::BlockHeader};
use ethtrace_storage::Store;
use ethtrace_vm::{Evm, ExecutionEngine};

pub use crate::tracing::{SimulationOutcome, resolve_block};

/// Read-only view of the chain used to answer tracing requests.
///
/// Pairs the block store with the engine calls are simulated with.
#[derive(Clone)]
pub struct Blockchain {
    storage: Store,
    engine: Arc<dyn ExecutionEngine>,
}

impl std::fmt::Debug for Blockchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blockchain")
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl Blockchain {
    pub fn new(storage: Store, engine: Arc<dyn ExecutionEngine>) -> Self {
        Self { storage, engine }
    }

    /// Blockchain running calls on the bundled interpreter
    pub fn default_with_store(storage: Store) -> Self {
        Self::new(storage, Arc::new(Evm::new()))
    }

    pub fn storage(&self) -> &Store {
        &self.storage
    }

    pub fn supports_trace_type(&self, trace_type: TraceType, header: &BlockHeader) -> bool {
        self.engine.supports_trace_type(trace_type, header)
    }
}
