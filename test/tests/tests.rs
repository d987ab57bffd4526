mod blockchain;
mod cmd;
mod rpc;
