//! solswap - command line front end
//!
//! `quote` prints a summary for one amount, `swap` executes it with a local
//! keypair (Ctrl-C aborts), and `watch` feeds stdin lines through the
//! debounced quote controller.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solswap::{
    abort_pair, assets, metrics::metrics, Config, ConfirmationStatus, KeypairSigner, QuoteInput,
    SwapService, SwapSummary,
};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Print Prometheus metrics after the command finishes
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote an amount and print a summary
    Quote {
        /// Decimal amount of the input asset
        amount: String,
        #[arg(long, default_value = "SOL")]
        from: String,
        #[arg(long, default_value = "USDC")]
        to: String,
        #[arg(long)]
        slippage_bps: Option<u16>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quote, sign with a local keypair, broadcast and confirm
    Swap {
        amount: String,
        #[arg(long, default_value = "SOL")]
        from: String,
        #[arg(long, default_value = "USDC")]
        to: String,
        #[arg(long)]
        slippage_bps: Option<u16>,
        /// Keypair file; defaults to wallet.keypair_path
        #[arg(long, env = "SOLSWAP_KEYPAIR")]
        keypair: Option<String>,
    },
    /// Read amounts from stdin and print the latest debounced quote.
    /// A line `pair <FROM> <TO>` switches the pair.
    Watch {
        #[arg(long, default_value = "SOL")]
        from: String,
        #[arg(long, default_value = "USDC")]
        to: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    let config = load_config(&args.config)?;
    let service = SwapService::from_config(config).context("Failed to initialise swap service")?;

    let outcome = match args.command {
        Command::Quote {
            amount,
            from,
            to,
            slippage_bps,
            json,
        } => run_quote(&service, &amount, &from, &to, slippage_bps, json).await,
        Command::Swap {
            amount,
            from,
            to,
            slippage_bps,
            keypair,
        } => run_swap(&service, &amount, &from, &to, slippage_bps, keypair).await,
        Command::Watch { from, to } => run_watch(&service, &from, &to).await,
    };

    if args.metrics {
        println!("{}", metrics().gather_text()?);
    }
    outcome
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "solswap=debug,info"
    } else {
        "solswap=info,warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .context("Failed to initialise logging")?;

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Config::from_env().context("Invalid environment overrides")
    }
}

async fn run_quote(
    service: &SwapService,
    amount: &str,
    from: &str,
    to: &str,
    slippage_bps: Option<u16>,
    json: bool,
) -> Result<()> {
    let slippage_bps = slippage_bps.unwrap_or(service.config().quote.slippage_bps);
    let quote = service
        .request_quote_with_slippage(amount, from, to, slippage_bps)
        .await?;
    let summary = SwapSummary::from_quote(&quote);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary);
    }
    Ok(())
}

async fn run_swap(
    service: &SwapService,
    amount: &str,
    from: &str,
    to: &str,
    slippage_bps: Option<u16>,
    keypair: Option<String>,
) -> Result<()> {
    let keypair_path = keypair.unwrap_or_else(|| service.config().wallet.keypair_path.clone());
    info!("🔑 Loading keypair from: {}", keypair_path);
    let signer = KeypairSigner::from_file(&keypair_path).context("Failed to load wallet")?;

    let input = assets::resolve(from)?;
    let output = assets::resolve(to)?;
    let slippage_bps = slippage_bps.unwrap_or(service.config().quote.slippage_bps);

    let mut session = service.session();
    let quote = session.request_quote(amount, input, output, slippage_bps).await?;
    println!("{}", SwapSummary::from_quote(quote));

    let (handle, signal) = abort_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Abort requested");
            handle.abort();
        }
    });

    let result = session.execute(&signer, &signal).await?;
    println!("Signature: {}", result.signature);
    match result.status {
        ConfirmationStatus::Confirmed => {
            println!("Status:    confirmed at {}", result.observed_at.to_rfc3339())
        }
        ConfirmationStatus::Expired => println!(
            "Status:    expired; the transaction may still have landed, \
             check the signature before retrying"
        ),
        ConfirmationStatus::Failed => println!("Status:    failed"),
    }
    result.into_result()?;
    Ok(())
}

async fn run_watch(service: &SwapService, from: &str, to: &str) -> Result<()> {
    let controller = service.quote_controller(from, to)?;
    let (input_tx, input_rx) = mpsc::channel(64);
    let (update_tx, mut update_rx) = mpsc::channel(16);
    let controller = tokio::spawn(controller.run(input_rx, update_tx));

    let reader = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let event = match line.split_whitespace().collect::<Vec<_>>().as_slice() {
                ["pair", from, to] => match (assets::resolve(from), assets::resolve(to)) {
                    (Ok(input), Ok(output)) => QuoteInput::Pair { input, output },
                    (Err(e), _) | (_, Err(e)) => {
                        eprintln!("{}", e);
                        continue;
                    }
                },
                _ => QuoteInput::Amount(line.trim().to_string()),
            };
            if input_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    while let Some(update) = update_rx.recv().await {
        match &update.result {
            Ok(quote) => println!("[#{}] {}", update.seq, SwapSummary::from_quote(quote)),
            Err(e) => println!("[#{}] {}: {}", update.seq, update.amount, e),
        }
    }

    reader.await.context("stdin reader panicked")?;
    controller.await.context("quote controller panicked")?;
    Ok(())
}
