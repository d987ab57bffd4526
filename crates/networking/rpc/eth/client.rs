use serde_json::Value;
use tracing::debug;

use crate::{context::RpcApiContext, router::RpcHandler, rpc_types::RpcErr};

pub struct ChainId;

impl RpcHandler for ChainId {
    fn parse(_params: &Option<Vec<Value>>) -> Result<Self, RpcErr> {
        Ok(Self {})
    }

    async fn handle(&self, context: RpcApiContext) -> Result<Value, RpcErr> {
        debug!("Requested chain id");
        let chain_spec = context
            .storage
            .get_chain_config()?
            .ok_or(RpcErr::Internal("Failed to fetch chain config".to_string()))?;
        serde_json::to_value(format!("{:#x}", chain_spec.chain_id))
            .map_err(|error| RpcErr::Internal(error.to_string()))
    }
}
