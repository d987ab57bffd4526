use clap::{ArgAction, Parser as ClapParser};
use tracing::Level;

pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");

#[allow(clippy::upper_case_acronyms)]
#[derive(ClapParser)]
#[command(name="ethtrace", author, version=VERSION_STRING, about = "Serves trace_call over JSON-RPC", long_about = None)]
pub struct CLI {
    #[clap(flatten)]
    pub opts: Options,
}

#[derive(ClapParser, Debug)]
pub struct Options {
    #[arg(
        long = "http.addr",
        default_value = "localhost",
        value_name = "ADDRESS",
        env = "ETHTRACE_HTTP_ADDR"
    )]
    pub http_addr: String,
    #[arg(
        long = "http.port",
        default_value = "8545",
        value_name = "PORT",
        env = "ETHTRACE_HTTP_PORT"
    )]
    pub http_port: String,
    #[arg(
        long = "log.level",
        default_value_t = Level::INFO,
        value_name = "LOG_LEVEL",
        env = "ETHTRACE_LOG_LEVEL"
    )]
    pub log_level: Level,
    #[arg(
        long = "network",
        value_name = "GENESIS_FILE_PATH",
        help = "Genesis file the in-memory chain is built from",
        env = "ETHTRACE_NETWORK"
    )]
    pub network: String,
    #[arg(
        long = "import",
        value_name = "CHAIN_FILE_PATH",
        help = "JSON chain file whose blocks are imported on top of the genesis block",
        env = "ETHTRACE_IMPORT"
    )]
    pub import: Option<String>,
    #[arg(
        long = "trace.timeout",
        default_value_t = 5,
        value_name = "SECONDS",
        help = "Time a trace_call simulation may run before it is abandoned",
        env = "ETHTRACE_TRACE_TIMEOUT"
    )]
    pub trace_timeout: u64,
    #[arg(
        long = "metrics",
        action = ArgAction::SetTrue,
        help = "Serve prometheus metrics on GET /metrics",
        env = "ETHTRACE_METRICS"
    )]
    pub metrics_enabled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            http_addr: "localhost".to_string(),
            http_port: "8545".to_string(),
            log_level: Level::INFO,
            network: Default::default(),
            import: None,
            trace_timeout: 5,
            metrics_enabled: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_only_need_a_network() {
        let CLI { opts } = CLI::try_parse_from(["ethtrace", "--network", "genesis.json"]).unwrap();
        assert_eq!(opts.network, "genesis.json");
        assert_eq!(opts.http_port, "8545");
        assert_eq!(opts.trace_timeout, 5);
        assert_eq!(opts.log_level, Level::INFO);
        assert_eq!(opts.import, None);
        assert!(!opts.metrics_enabled);
    }

    #[test]
    fn dotted_flags() {
        let CLI { opts } = CLI::try_parse_from([
            "ethtrace",
            "--network",
            "genesis.json",
            "--http.addr",
            "0.0.0.0",
            "--http.port",
            "9545",
            "--log.level",
            "debug",
            "--trace.timeout",
            "30",
            "--import",
            "chain.json",
            "--metrics",
        ])
        .unwrap();
        assert_eq!(opts.http_addr, "0.0.0.0");
        assert_eq!(opts.http_port, "9545");
        assert_eq!(opts.log_level, Level::DEBUG);
        assert_eq!(opts.trace_timeout, 30);
        assert_eq!(opts.import.as_deref(), Some("chain.json"));
        assert!(opts.metrics_enabled);
    }
}
