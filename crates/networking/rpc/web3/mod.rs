use serde_json::Value;

use crate::context::RpcApiContext;
use crate::rpc_types::{RpcErr, RpcRequest};

const CLIENT_NAME: &str = "ethtrace";

pub fn map_web3_requests(req: &RpcRequest, context: RpcApiContext) -> Result<Value, RpcErr> {
    match req.method.as_str() {
        "web3_clientVersion" => client_version(req, context),
        unknown_web3_method => Err(RpcErr::MethodNotFound(unknown_web3_method.to_owned())),
    }
}

pub fn client_version(_req: &RpcRequest, _context: RpcApiContext) -> Result<Value, RpcErr> {
    Ok(Value::String(format!(
        "{}/v{}/{}-{}",
        CLIENT_NAME,
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH,
    )))
}
