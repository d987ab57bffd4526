use clap::Parser;
use ethtrace::{
    cli::CLI,
    initializers::{
        get_http_socket_addr, import_blocks, init_blockchain, init_metrics, init_rpc_context,
        init_store, init_tracing,
    },
    utils::{read_chain_file, read_genesis_file},
};
use ethtrace_rpc::start_api;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let CLI { opts } = CLI::parse();

    init_tracing(&opts)?;

    let genesis = read_genesis_file(&opts.network)?;
    let store = init_store(genesis).await?;
    if let Some(chain_file) = &opts.import {
        import_blocks(&store, read_chain_file(chain_file)?).await?;
    }
    let blockchain = init_blockchain(store);
    let metrics = init_metrics(&opts)?;
    let context = init_rpc_context(&opts, blockchain, metrics.clone());

    let http_addr = get_http_socket_addr(&opts)?;
    start_api(http_addr, context, metrics).await?;

    Ok(())
}
