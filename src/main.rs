use drinkbot::config::{Config, Credentials};
use drinkbot::onchain::abi::{self, BAR_ADDRESS};
use drinkbot::onchain::{AlloyBar, BarContract};
use drinkbot::poller::{PollEvent, PollExit, Poller, Scheduler};

use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

const CONFIG_PATH: &str = "drinkbot.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = if Path::new(CONFIG_PATH).exists() {
        Config::load(Path::new(CONFIG_PATH))?
    } else {
        Config::from_env()?
    };
    let variant = config.poller.variant;

    init_logging(&config);

    info!("drinkbot v{} starting", env!("CARGO_PKG_VERSION"));

    // Secrets and the contract interface are both required; fail fast.
    let credentials = Credentials::from_env()?;
    let interface = abi::load_interface(Path::new(abi::INTERFACE_PATH))?;
    debug!(functions = interface.functions.len(), "contract interface loaded");

    let bar = AlloyBar::connect(&credentials, BAR_ADDRESS)?;
    info!(
        account = %bar.account(),
        contract = %bar.contract_address(),
        variant = %variant,
        interval_secs = variant.poll_interval().as_secs(),
        "watching..."
    );

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PollEvent>();
    let poller = Poller::new(Arc::new(bar), variant, event_tx);
    let handle = Scheduler::for_variant(variant).start(poller);

    loop {
        tokio::select! {
            Some(event) = event_rx.recv() => {
                match event {
                    PollEvent::BarClosed => {
                        info!("no further checks will run; waiting on pending confirmations (Ctrl-C to exit)");
                    }
                    PollEvent::TickFailed { fatal: true, .. } => {
                        return match handle.stop().await {
                            PollExit::Failed(e) => Err(e.into()),
                            exit => Err(anyhow::anyhow!("polling halted: {exit:?}")),
                        };
                    }
                    PollEvent::ConfirmationFailed { drink, tx_hash, reason } => {
                        warn!(drink = %drink, tx = %tx_hash, reason = %reason, "mint did not land, will retry next tick");
                    }
                    other => debug!(event = %other, "poll event"),
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down...");
                match handle.stop().await {
                    PollExit::Aborted(reason) => error!(reason = %reason, "poll task aborted"),
                    exit => debug!(exit = ?exit, "poll task ended"),
                }
                break;
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Config) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    let timestamps = config.poller.variant.log_timestamps();
    match (config.logging.json, timestamps) {
        (true, _) => tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .init(),
        (false, true) => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .init(),
        (false, false) => tracing_subscriber::fmt()
            .without_time()
            .with_env_filter(env_filter)
            .init(),
    }
}
