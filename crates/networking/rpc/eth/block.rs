use serde_json::Value;
use tracing::debug;

use crate::{context::RpcApiContext, router::RpcHandler, rpc_types::RpcErr};

pub struct BlockNumberRequest;

impl RpcHandler for BlockNumberRequest {
    fn parse(_params: &Option<Vec<Value>>) -> Result<BlockNumberRequest, RpcErr> {
        Ok(Self {})
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        debug!("Requested latest block number");
        let block_number = context.storage.get_latest_block_number()?;
        serde_json::to_value(format!("{:#x}", block_number))
            .map_err(|error| RpcErr::Internal(error.to_string()))
    }
}
