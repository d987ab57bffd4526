use std::{net::SocketAddr, sync::Arc, time::Duration};

use ethtrace_blockchain::Blockchain;
use ethtrace_common::types::{BlockIdentifier, BlockTag, ChainFile, Genesis};
use ethtrace_metrics::MetricsTrace;
use ethtrace_rpc::{LoggingObserver, MetricsObserver, ObserverSet, RpcApiContext, TraceObserver};
use ethtrace_storage::{ChainStateLookup, Store};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, Layer, Registry, filter::Directive, fmt, layer::SubscriberExt};

use crate::{cli::Options, utils::parse_socket_addr};

pub fn init_tracing(opts: &Options) -> eyre::Result<()> {
    let log_filter = EnvFilter::builder()
        .with_default_directive(Directive::from(opts.log_level))
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_filter(log_filter);
    let subscriber = Registry::default().with(fmt_layer);

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Builds the in-memory store holding the genesis block
pub async fn init_store(genesis: Genesis) -> eyre::Result<Store> {
    let store = Store::new();
    let header = store.add_initial_state(genesis).await?;
    info!(
        number = header.number,
        hash = %header.hash(),
        "Loaded genesis block"
    );
    Ok(store)
}

/// Imports every block of `chain` on top of the current head, then applies its safe and
/// finalized marks.
pub async fn import_blocks(store: &Store, chain: ChainFile) -> eyre::Result<()> {
    let latest = BlockIdentifier::Tag(BlockTag::Latest);
    for block in &chain.blocks {
        let head = store
            .resolve_header(&latest)?
            .ok_or_else(|| eyre::eyre!("Cannot import blocks without a genesis block"))?;
        let state = store
            .state_snapshot_at(&head)?
            .ok_or_else(|| eyre::eyre!("Missing state for block {}", head.number))?;
        let updates: Vec<_> = block
            .accounts
            .iter()
            .map(|(address, account)| account.to_update(*address, state.get_account(address)))
            .collect();
        let header = store.add_block(block.timestamp, &updates).await?;
        debug!(number = header.number, accounts = updates.len(), "Imported block");
    }
    if let Some(safe) = chain.safe {
        store.update_safe_block_number(safe).await?;
    }
    if let Some(finalized) = chain.finalized {
        store.update_finalized_block_number(finalized).await?;
    }
    info!(
        imported = chain.blocks.len(),
        head = store.get_latest_block_number()?,
        "Imported chain file"
    );
    Ok(())
}

pub fn init_blockchain(store: Store) -> Arc<Blockchain> {
    info!("Initiating blockchain with the bundled interpreter");
    Blockchain::default_with_store(store).into()
}

pub fn init_metrics(opts: &Options) -> eyre::Result<Option<MetricsTrace>> {
    if !opts.metrics_enabled {
        return Ok(None);
    }
    info!("Serving metrics on GET /metrics");
    Ok(Some(MetricsTrace::new()?))
}

pub fn init_rpc_context(
    opts: &Options,
    blockchain: Arc<Blockchain>,
    metrics: Option<MetricsTrace>,
) -> RpcApiContext {
    let observer: Arc<dyn TraceObserver> = match metrics {
        Some(metrics) => Arc::new(ObserverSet::new(vec![
            Arc::new(LoggingObserver),
            Arc::new(MetricsObserver::new(metrics)),
        ])),
        None => Arc::new(LoggingObserver),
    };
    RpcApiContext::new(blockchain)
        .with_observer(observer)
        .with_trace_timeout(Duration::from_secs(opts.trace_timeout))
}

pub fn get_http_socket_addr(opts: &Options) -> eyre::Result<SocketAddr> {
    Ok(parse_socket_addr(&opts.http_addr, &opts.http_port)?)
}
