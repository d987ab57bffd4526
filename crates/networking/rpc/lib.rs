mod context;
mod eth;
mod router;
mod rpc_types;
mod server;
mod trace;
mod web3;

pub mod types;

pub use context::{DEFAULT_TRACE_TIMEOUT, RpcApiContext};
pub use router::{RpcHandler, map_http_requests};
pub use rpc_types::{
    RpcErr, RpcErrorMetadata, RpcErrorResponse, RpcNamespace, RpcRequest, RpcRequestId,
    RpcSuccessResponse,
};
pub use server::{RpcRequestWrapper, build_router, rpc_response, start_api};
pub use trace::{
    TraceCallRequest,
    assembler::TraceCallResult,
    errors::TraceCallError,
    flat_trace::{FlatTrace, TraceOutput},
    observer::{LoggingObserver, MetricsObserver, ObserverSet, TraceObserver, TraceStage},
    options::configure,
    state_diff::StateDiff,
    vm_trace::VmTrace,
};
