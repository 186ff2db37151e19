use anyhow::anyhow;
use clap::{Parser, Subcommand};

use crate::{
    api,
    instrument::Pair,
    market_maker::{self, QuoteConfig},
    simulate::{SimConfig, run_simulation},
    state::AppState,
    utils,
};

/// Command line entrypoint for the exchange engine.
#[derive(Parser)]
#[command(name = "exchange-engine")]
#[command(version = "0.1", about = "A limit order book exchange engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP/WS trading service
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:3000")]
        addr: String,
    },

    /// Fire randomized order flow at a running service
    Simulate {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        api_base: String,

        /// Market to trade
        #[arg(long, default_value = "BTC-USD")]
        symbol: String,

        /// Stop after this many seconds (runs until ctrl-c when omitted)
        #[arg(long)]
        run_secs: Option<u64>,

        /// Poisson arrival rate of orders per second
        #[arg(long, default_value_t = 5.0)]
        rate_hz: f64,

        /// Std-dev of the Gaussian mid-price drift applied per order
        #[arg(long, default_value_t = 0.5)]
        noise_sigma: f64,

        /// Mean order size
        #[arg(long, default_value_t = 3.0)]
        mean_size: f64,
    },

    /// Run a naive two-sided quoting bot against a running service
    MakeMarket {
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        api_base: String,

        /// Market to quote
        #[arg(long, default_value = "BTC-USD")]
        symbol: String,

        /// Half-spread quoted around the mid price
        #[arg(long, default_value_t = 2)]
        spread: u64,

        /// Requote pace in milliseconds
        #[arg(long, default_value_t = 500)]
        pace_ms: u64,

        /// Size quoted on each side
        #[arg(long, default_value_t = 1)]
        quote_size: u64,
    },
}

fn parse_pair(symbol: &str) -> anyhow::Result<Pair> {
    symbol.parse::<Pair>().map_err(|e| anyhow!(e))
}

async fn serve(addr: &str) -> anyhow::Result<()> {
    let state = AppState::new();
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "exchange engine listening");

    let token = utils::shutdown_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    utils::init_tracing();

    match cli.command {
        Commands::Serve { addr } => serve(&addr).await,
        Commands::Simulate {
            api_base,
            symbol,
            run_secs,
            rate_hz,
            noise_sigma,
            mean_size,
        } => {
            let cfg = SimConfig {
                api_base,
                symbol: parse_pair(&symbol)?,
                run_secs,
                rate_hz,
                noise_sigma,
                mean_size,
            };
            run_simulation(cfg, utils::shutdown_token()).await
        }
        Commands::MakeMarket {
            api_base,
            symbol,
            spread,
            pace_ms,
            quote_size,
        } => {
            let cfg = QuoteConfig {
                api_base,
                symbol: parse_pair(&symbol)?,
                spread,
                pace_ms,
                quote_size,
            };
            market_maker::run_market_maker(cfg, utils::shutdown_token()).await
        }
    }
}
