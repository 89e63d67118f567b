use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use vwap_screener::notify::{LogNotifier, Notifier, TelegramNotifier};
use vwap_screener::providers::{MarketDataProvider, OandaProvider, YahooProvider};
use vwap_screener::{report, Market, Screener, ScreenerConfig};

#[derive(Parser, Debug)]
#[command(name = "vwap-screener")]
#[command(about = "Intraday VWAP screener for NSE index, NIFTY 50 stocks and commodities")]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Market to scan
    #[arg(short, long, value_enum, default_value_t = Market::Index, global = true)]
    market: Market,

    /// Override the market's symbol list (comma-separated)
    #[arg(short, long, global = true)]
    symbols: Option<String>,

    /// OANDA API key, required for commodities
    #[arg(long, env = "OANDA_API_KEY", hide_env_values = true, global = true)]
    oanda_api_key: Option<String>,

    /// OANDA account type (practice or live)
    #[arg(long, env = "OANDA_ACCOUNT_TYPE", default_value = "practice", global = true)]
    oanda_account_type: String,

    /// Telegram bot token; alerts go to the log when unset
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true, global = true)]
    telegram_bot_token: Option<String>,

    /// Telegram chat id
    #[arg(long, env = "TELEGRAM_CHAT_ID", global = true)]
    telegram_chat_id: Option<String>,

    /// Per-instrument fetch timeout in seconds
    #[arg(long, default_value = "10", global = true)]
    fetch_timeout: u64,

    /// Concurrent fetches per cycle
    #[arg(long, default_value = "8", global = true)]
    concurrency: usize,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Refresh continuously until Ctrl-C
    Watch {
        /// Seconds between cycles
        #[arg(short, long, default_value = "60")]
        interval: u64,

        /// Overwrite this CSV with every cycle's results
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Clear alert state when the exchange date rolls over
        #[arg(long)]
        reset_alerts_daily: bool,
    },
    /// Run a single cycle and print the table
    Scan {
        /// Also write the results as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn build_provider(args: &Args, timeout: Duration) -> Result<Arc<dyn MarketDataProvider>> {
    if args.market.is_commodity() {
        let api_key = args.oanda_api_key.as_deref().unwrap_or_default();
        let provider = OandaProvider::new(api_key, &args.oanda_account_type, timeout)
            .context("Failed to create OANDA client")?;
        return Ok(Arc::new(provider));
    }
    let provider = YahooProvider::new(timeout).context("Failed to create Yahoo client")?;
    Ok(Arc::new(provider))
}

fn build_notifier(args: &Args, timeout: Duration) -> Result<Arc<dyn Notifier>> {
    match (&args.telegram_bot_token, &args.telegram_chat_id) {
        (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
            info!("Alerts will be sent to Telegram chat {}", chat_id);
            let notifier =
                TelegramNotifier::new(token, chat_id, timeout).context("Failed to create Telegram client")?;
            Ok(Arc::new(notifier))
        }
        _ => {
            info!("Telegram not configured, alerts go to the log");
            Ok(Arc::new(LogNotifier))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("vwap_screener=info".parse()?),
        )
        .init();

    let timeout = Duration::from_secs(args.fetch_timeout);

    let mut config = ScreenerConfig {
        fetch_timeout: timeout,
        concurrency: args.concurrency,
        ..ScreenerConfig::default()
    };
    if let Some(list) = &args.symbols {
        let symbols: Vec<String> = list
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        config.universe.set_symbols(args.market, symbols);
    }

    let provider = build_provider(&args, timeout)?;
    let notifier = build_notifier(&args, timeout)?;
    info!("Scanning {} with {} data", args.market, provider.name());

    match args.command {
        Commands::Watch { interval, csv, reset_alerts_daily } => {
            config.refresh_interval = Duration::from_secs(interval.max(1));
            config.reset_alerts_on_new_session = reset_alerts_daily;
            let screener = Screener::new(args.market, config, provider, notifier);
            screener.watch(csv).await?;
        }
        Commands::Scan { csv } => {
            let mut screener = Screener::new(args.market, config, provider, notifier);
            let cycle = screener.run_cycle().await;
            print!("{}", report::render_table(&cycle));
            for skip in &cycle.skipped {
                info!("skipped {}: {}", skip.symbol, skip.reason);
            }
            if let Some(path) = csv {
                report::write_csv_file(&path, &cycle)?;
                info!("Wrote {}", path.display());
            }
            screener.flush_deliveries(timeout).await;
        }
    }

    Ok(())
}
