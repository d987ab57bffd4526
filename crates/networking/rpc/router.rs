use serde_json::Value;

use crate::context::RpcApiContext;
use crate::rpc_types::{RpcErr, RpcNamespace, RpcRequest};

#[allow(async_fn_in_trait)]
pub trait RpcHandler: Sized {
    fn parse(params: &Option<Vec<Value>>) -> Result<Self, RpcErr>;

    async fn call(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
        let request = Self::parse(&req.params)?;
        request.handle(context).await
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr>;
}

/// Handle requests that can come from either clients or other users
pub async fn map_http_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.namespace() {
        Ok(RpcNamespace::Eth) => crate::eth::map_eth_requests(req, context).await,
        Ok(RpcNamespace::Trace) => crate::trace::map_trace_requests(req, context).await,
        Ok(RpcNamespace::Web3) => crate::web3::map_web3_requests(req, context),
        Err(err) => Err(err),
    }
}
