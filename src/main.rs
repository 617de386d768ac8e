//! solpay-tracker binary
//!
//! `run` (the default) backfills history for the tracked wallet and then
//! polls the feed forever. The remaining subcommands are ad-hoc
//! inspection and testing aids around the same feed and storage.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use solana_sdk::pubkey::Pubkey;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solpay_tracker::config::Config;
use solpay_tracker::feed::RpcFeed;
use solpay_tracker::handlers::{self, PageBound};
use solpay_tracker::storage::TransferStore;
use solpay_tracker::tracker::PaymentTracker;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Backfill history, then poll the feed forever (default)
    Run,
    /// List storage trees, or dump one tree's documents
    Collections { name: Option<String> },
    /// List recent confirmed signatures for the tracked wallet
    Txns,
    /// Send SOL to the tracked wallet (testing aid)
    Send {
        #[arg(default_value_t = 0.0001)]
        amount: f64,
    },
    /// Fetch a raw signature page relative to a cursor signature
    Sigs {
        #[arg(value_enum)]
        bound: Bound,
        signature: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Bound {
    Before,
    Until,
}

impl From<Bound> for PageBound {
    fn from(bound: Bound) -> Self {
        match bound {
            Bound::Before => PageBound::Before,
            Bound::Until => PageBound::Until,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("starting solpay tracker v{}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args.config)?;

    let receiver: Pubkey = config
        .tracker
        .receiver
        .parse()
        .with_context(|| format!("invalid receiver address {:?}", config.tracker.receiver))?;
    let feed = RpcFeed::new(&config.rpc.url, config.rpc.timeout_secs, receiver);

    match args.command.unwrap_or(Command::Run) {
        Command::Run => {
            let store = TransferStore::open(&config.storage.path)
                .context("failed to open local storage")?;
            let tracker = PaymentTracker::new(feed, store, config.tracker.clone())
                .context("tracker refused to start")?;
            if let Err(err) = tracker.run().await {
                error!(error = %err, "payment tracker terminated");
                return Err(err.into());
            }
        }
        Command::Collections { name } => {
            let store = TransferStore::open(&config.storage.path)
                .context("failed to open local storage")?;
            match name {
                Some(name) => {
                    for document in store.dump_tree(&name)? {
                        println!("{}", serde_json::to_string_pretty(&document)?);
                    }
                }
                None => {
                    for name in store.tree_names() {
                        println!("{name}");
                    }
                }
            }
        }
        Command::Txns => {
            for signature in handlers::confirmed_signatures(&feed).await? {
                println!("{signature}");
            }
        }
        Command::Send { amount } => {
            let sender = handlers::sender_keypair_from_env()?;
            let signature =
                handlers::send_payment(feed.client(), &sender, &receiver, amount).await?;
            println!("{signature}");
        }
        Command::Sigs { bound, signature } => {
            let page = handlers::signatures_page(&feed, bound.into(), &signature).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "solpay_tracker=debug,info"
    } else {
        "solpay_tracker=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        dotenvy::dotenv().ok();
        Ok(Config::default())
    }
}
