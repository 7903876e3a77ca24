//! Cradle screener: entry point.
//!
//! Loads configuration, initialises structured logging, and either runs a
//! single scan over the Bitget USDT perpetual universe or serves the scan
//! API over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use cradle_screener::config::AppConfig;
use cradle_screener::dashboard::{self, DashboardState};
use cradle_screener::engine::scanner::Screener;
use cradle_screener::exchange::bitget::BitgetClient;
use cradle_screener::report::{self, GroupedReport};
use cradle_screener::types::Timeframe;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Comma-separated timeframes to scan, e.g. 1h,4h,1d
    #[arg(long, value_delimiter = ',')]
    timeframes: Option<Vec<Timeframe>>,

    /// Print the grouped report as JSON instead of tables
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Serve the scan API instead of running a single scan
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Dashboard port (overrides config)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    init_logging();

    let cfg = AppConfig::load_or_default(&cli.config)?;
    info!(
        config = %cli.config,
        exchange = %cfg.exchange.base_url,
        interval_ms = cfg.scan.request_interval_ms,
        burst = cfg.scan.burst,
        concurrency = cfg.scan.max_concurrency,
        "Cradle screener starting up"
    );

    let client = BitgetClient::new(&cfg.exchange).context("Failed to build exchange client")?;
    let screener = Screener::from_config(Arc::new(client), &cfg);
    let timeframes = cli
        .timeframes
        .filter(|tfs| !tfs.is_empty())
        .unwrap_or_else(|| cfg.scan.default_timeframes.clone());

    if cli.serve {
        let port = cli.port.unwrap_or(cfg.dashboard.port);
        let state = Arc::new(DashboardState::new(screener, timeframes));
        return dashboard::serve(state, port).await;
    }

    let grouped = GroupedReport::from(screener.run_scan(&timeframes).await);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&grouped)?);
    } else {
        println!("{}", report::render_groups(&grouped.groups));
        println!("Scan complete");
    }

    info!(
        pairs = grouped.pairs_evaluated,
        setups = grouped.total,
        skipped = grouped.skipped.total(),
        elapsed_ms = grouped.elapsed_ms,
        "Scan complete"
    );
    Ok(())
}

/// Initialise the `tracing` subscriber. Logs go to stderr.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("cradle_screener=info"));

    let json_logging = std::env::var("CRADLE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
