use std::{sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use eyre::Result;
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

mod api;
mod client;
mod db;
mod error;
mod models;
mod normalize;
mod pipeline;
mod stats;

use models::SortOrder;
use normalize::{FixedRates, StableTokens};

#[derive(Parser, Debug)]
#[command(name = "eth-stats", version)]
struct Cli {
    /// Path to SQLite database file for the query history
    #[arg(long, env = "DB_PATH", default_value = "eth_stats.sqlite")]
    db_path: String,

    /// Etherscan-compatible API base URL
    #[arg(long, env = "API_URL", default_value = "https://api.etherscan.io/api")]
    api_url: String,

    /// Explorer API key
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    api_key: Option<String>,

    /// Records requested per page
    #[arg(long, env = "PAGE_SIZE", default_value_t = 10_000)]
    page_size: u64,

    /// Pause between page requests, in milliseconds
    #[arg(long, env = "PAUSE_MS", default_value_t = 210)]
    pause_ms: u64,

    /// Fixed ETH -> EUR snapshot rate
    #[arg(long, env = "FIXED_ETH_EUR_RATE", default_value = "3659.00")]
    eth_eur_rate: Decimal,

    /// Fixed USD -> EUR snapshot rate
    #[arg(long, env = "FIXED_USD_EUR_RATE", default_value = "0.85")]
    usd_eur_rate: Decimal,

    /// HTTP bind address for the query API
    #[arg(long, env = "HTTP_BIND", default_value = "127.0.0.1:8080")]
    http_bind: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP stats API
    Serve,
    /// Compute one report and print it as JSON
    Stats {
        /// Account address to audit
        address: String,

        /// Merge internal transfers into the ETH series
        #[arg(long)]
        include_internal: bool,

        /// Fetch allow-listed stablecoin transfers as a separate series
        #[arg(long)]
        include_tokens: bool,

        /// Drop zero-value ETH transfers
        #[arg(long)]
        exclude_zero_eth: bool,

        /// Also compute stats over ETH and stablecoins combined
        #[arg(long)]
        unified: bool,

        #[arg(long, default_value_t = 0)]
        startblock: u64,

        #[arg(long, default_value_t = 99_999_999)]
        endblock: u64,

        #[arg(long, value_enum, default_value_t = SortOrder::Asc)]
        sort: SortOrder,
    },
    /// Show recently queried addresses
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Print the schema used by the history store
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Subscriber::builder().with_env_filter(filter).init();

    let cli = Cli::parse();

    let rates = FixedRates {
        eth_eur: cli.eth_eur_rate,
        usd_eur: cli.usd_eur_rate,
    };
    rates.validate()?;

    let conn = db::init(&cli.db_path)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let client = client::EtherscanClient::new(
                cli.api_url,
                cli.api_key,
                cli.page_size,
                Duration::from_millis(cli.pause_ms),
            )?;
            let state = api::AppState {
                conn: Arc::new(Mutex::new(conn)),
                client: Arc::new(client),
                rates,
                tokens: StableTokens::default(),
            };
            api::serve(state, &cli.http_bind).await?;
        }
        Commands::Stats {
            address,
            include_internal,
            include_tokens,
            exclude_zero_eth,
            unified,
            startblock,
            endblock,
            sort,
        } => {
            models::parse_address(&address)?;
            let client = client::EtherscanClient::new(
                cli.api_url,
                cli.api_key,
                cli.page_size,
                Duration::from_millis(cli.pause_ms),
            )?;
            db::record_query(&conn, &address)?;

            let request = pipeline::ReportRequest {
                address,
                include_internal,
                include_tokens,
                exclude_zero_eth,
                unified,
                startblock,
                endblock,
                sort,
            };
            let report =
                pipeline::compute_report(&client, &rates, &StableTokens::default(), &request)
                    .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::History { limit } => {
            let rows = db::recent_queries(&conn, limit)?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Commands::Schema => {
            println!("{}", db::SCHEMA_SQL);
        }
    }

    Ok(())
}
