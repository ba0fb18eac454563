use std::path::PathBuf;

use clap::Parser;
use storeview_cli::{IndexerOverrides, RunOptions};
use storeview_core::BigIntPolicy;
use storeview_http::IndexerConfig;

/// storeview - project fields out of a contract storage snapshot
#[derive(Parser, Debug)]
#[command(name = "storeview")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Storage snapshot document (JSON)
    #[arg(long)]
    storage: PathBuf,

    /// Selector list (JSON); the whole storage is rendered when omitted
    #[arg(long)]
    selectors: Option<PathBuf>,

    /// Base URL of the indexer serving big map keys [env: STOREVIEW_INDEXER_URL]
    #[arg(long)]
    indexer_url: Option<String>,

    /// Indexer request timeout in milliseconds [env: STOREVIEW_INDEXER_TIMEOUT_MS]
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Extra attempts after the indexer answers 502 [env: STOREVIEW_INDEXER_RETRIES]
    #[arg(long)]
    retries: Option<u32>,

    /// Big integers beyond 64 bits: lossy, strict or string
    #[arg(long, default_value_t = BigIntPolicy::Lossy)]
    big_int: BigIntPolicy,

    /// Pretty-print the output
    #[arg(long)]
    pretty: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.as_str().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let indexer = match IndexerConfig::from_env() {
        Ok(config) => IndexerOverrides {
            base_url: args.indexer_url,
            timeout_ms: args.timeout_ms,
            retry_attempts: args.retries,
        }
        .apply(config),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let options = RunOptions {
        storage: args.storage,
        selectors: args.selectors,
        indexer,
        big_int: args.big_int,
        pretty: args.pretty,
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Error: cannot start runtime: {}", e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(storeview_cli::run(&options)) {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
