mod engine;
mod errors;
mod execution_result;
mod interpreter;
pub mod tracing;

pub use engine::{EngineOutcome, ExecutedTransaction, ExecutionEngine};
pub use errors::{EvmError, ExceptionalHalt, InternalError, TxValidationError};
pub use execution_result::ExecutionResult;
pub use interpreter::{Evm, GeneralizedDatabase};
