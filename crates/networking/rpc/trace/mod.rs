pub(crate) mod assembler;
pub(crate) mod errors;
pub(crate) mod flat_trace;
pub(crate) mod observer;
pub(crate) mod options;
pub(crate) mod parameters;
pub(crate) mod state_diff;
pub(crate) mod vm_trace;

use std::time::Instant;

use ethtrace_common::{
    tracing::TraceTypeSet,
    types::{BlockIdentifier, CallParameters},
};
use serde_json::Value;
use tracing::debug;

use crate::{
    context::RpcApiContext,
    router::RpcHandler,
    rpc_types::{RpcErr, RpcRequest},
    types::block_identifier::parse_block_identifier,
};
use assembler::TraceCallResult;
use errors::TraceCallError;
use observer::{TraceObserver, TraceStage};

pub async fn map_trace_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.method.as_str() {
        "trace_call" => TraceCallRequest::call(req, context).await,
        unknown_trace_method => Err(RpcErr::MethodNotFound(unknown_trace_method.to_owned())),
    }
}

/// `trace_call`: runs a call on top of a past block and traces it.
///
/// Params: `[call, traceTypes, block?]`, the block defaults to `latest`.
#[derive(Debug, Clone)]
pub struct TraceCallRequest {
    pub call: CallParameters,
    pub trace_types: TraceTypeSet,
    pub block: BlockIdentifier,
}

impl TraceCallRequest {
    fn parse_params(params: &Option<Vec<Value>>) -> Result<Self, TraceCallError> {
        let params = params.as_ref().ok_or(TraceCallError::MalformedCallParameters(
            "No params provided".to_owned(),
        ))?;
        if params.len() != 2 && params.len() != 3 {
            return Err(TraceCallError::MalformedCallParameters(format!(
                "Expected 2 or 3 params, got {}",
                params.len()
            )));
        }
        let call = parameters::validate_call(&params[0])?;
        let trace_types = parameters::parse_trace_types(&params[1])?;
        let block = parse_block_identifier(params.get(2))
            .map_err(TraceCallError::MalformedCallParameters)?;
        Ok(TraceCallRequest {
            call,
            trace_types,
            block,
        })
    }

    async fn trace(
        &self,
        context: &RpcApiContext,
        progress: &mut Progress<'_>,
    ) -> Result<TraceCallResult, TraceCallError> {
        let block = context.blockchain.resolve_block(&self.block)?;
        progress.advance(TraceStage::BlockResolved);

        if let Some(unsupported) = self
            .trace_types
            .iter()
            .find(|trace_type| !context.blockchain.supports_trace_type(**trace_type, &block.header))
        {
            return Err(TraceCallError::UnsupportedTraceKind(format!(
                "{unsupported} is not available at block {}",
                block.header.number
            )));
        }

        let options = options::configure(&self.trace_types);
        let started = Instant::now();
        let outcome = context
            .blockchain
            .simulate_call(
                self.call.clone(),
                options,
                block.clone(),
                context.trace_timeout,
            )
            .await?;
        progress.observer.on_simulation(started.elapsed());
        progress.advance(TraceStage::Simulated);

        let result = assembler::assemble(outcome, &self.trace_types, &block)?;
        progress.advance(TraceStage::Assembled);
        Ok(result)
    }
}

impl RpcHandler for TraceCallRequest {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        Self::parse_params(params).map_err(RpcErr::from)
    }

    async fn call(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
        let progress = Progress::new(context.observer.as_ref(), TraceStage::Received);
        let request = Self::parse_params(&req.params).map_err(|err| progress.reject(err))?;
        request.handle(context).await
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        debug!(
            block = %self.block,
            trace_types = ?self.trace_types,
            "Tracing call"
        );
        let mut progress = Progress::new(context.observer.as_ref(), TraceStage::Validated);
        let traced = self.trace(&context, &mut progress).await;
        let result = traced.map_err(|err| progress.reject(err))?;
        let value = serde_json::to_value(result)
            .map_err(|err| progress.reject(TraceCallError::Internal(err.to_string())))?;
        progress.advance(TraceStage::Done);
        Ok(value)
    }
}

/// Tracks the stage a request reached and reports it to the observer.
struct Progress<'a> {
    observer: &'a dyn TraceObserver,
    stage: TraceStage,
}

impl<'a> Progress<'a> {
    fn new(observer: &'a dyn TraceObserver, stage: TraceStage) -> Self {
        observer.on_transition(stage);
        Self { observer, stage }
    }

    fn advance(&mut self, stage: TraceStage) {
        self.stage = stage;
        self.observer.on_transition(stage);
    }

    fn reject(&self, err: TraceCallError) -> RpcErr {
        self.observer.on_rejection(self.stage, &err);
        err.into()
    }
}
