//! Round poller for the bar contract.
//!
//! Each tick:
//! 1. Checks the bar is open (and, for the `members` variant, still
//!    members-only). A closed bar ends polling for good.
//! 2. Reads the round counter and derives this round's drink.
//! 3. Skips the round if the wallet already holds the drink, or if a mint
//!    for it is still outstanding in the `MintLedger`.
//! 4. Otherwise sends one `mint` and returns as soon as the node accepts it.
//!    Confirmation is awaited on its own task.
//!
//! `Scheduler` drives ticks on the variant's interval and hands back a
//! `PollHandle` to stop it.

pub mod ledger;
pub mod scheduler;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use ledger::{MintLedger, MintState};
pub use scheduler::{PollExit, PollHandle, Scheduler};
pub use types::{PollError, PollEvent, TickOutcome, TickStep};

use crate::config::Variant;
use crate::onchain::abi::{mint_price, REFERRAL};
use crate::onchain::BarContract;
use crate::round;

use alloy::primitives::{TxHash, U256};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct Poller<C> {
    bar: Arc<C>,
    variant: Variant,
    ledger: MintLedger,
    events: mpsc::UnboundedSender<PollEvent>,
}

impl<C: BarContract> Poller<C> {
    pub fn new(bar: Arc<C>, variant: Variant, events: mpsc::UnboundedSender<PollEvent>) -> Self {
        Self {
            bar,
            variant,
            ledger: MintLedger::new(),
            events,
        }
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    pub fn ledger(&self) -> &MintLedger {
        &self.ledger
    }

    /// Run one check of the bar and mint if this round's drink is missing.
    pub async fn tick(&self) -> Result<TickOutcome, PollError> {
        if !self.bar_is_serving().await? {
            info!("bar is closed");
            self.ledger.close().await;
            self.emit(PollEvent::BarClosed);
            return Ok(TickOutcome::BarClosed);
        }

        let round = self
            .bar
            .current_round()
            .await
            .map_err(PollError::at(TickStep::CurrentRound))?;

        let Some(drink) = round::drink_for_round(round) else {
            warn!(
                round = %round,
                drink_index = round::drink_index(round),
                "round is past the last drink, not minting"
            );
            self.emit(PollEvent::MenuExhausted { round });
            return Ok(TickOutcome::MenuExhausted { round });
        };

        let balance = self
            .bar
            .balance_of(self.bar.account(), drink)
            .await
            .map_err(PollError::at(TickStep::BalanceOf))?;

        if balance > U256::ZERO {
            info!(drink = %drink, "already minted drink {}", drink);
            self.emit(PollEvent::AlreadyMinted { drink });
            return Ok(TickOutcome::AlreadyMinted { drink });
        }

        if let Err(state) = self.ledger.try_begin(drink).await {
            debug!(drink = %drink, state = ?state, "mint for drink still outstanding");
            return Ok(TickOutcome::InFlight { drink, state });
        }

        info!(drink = %drink, round = %round, "minting drink {}...", drink);
        let tx_hash = match self.bar.mint(REFERRAL, mint_price()).await {
            Ok(hash) => hash,
            Err(e) => {
                self.ledger.release(drink).await;
                return Err(PollError {
                    step: TickStep::Mint,
                    source: e,
                });
            }
        };
        self.ledger.submitted(drink, tx_hash).await;

        info!(drink = %drink, tx = %tx_hash, "transaction sent");
        self.emit(PollEvent::Submitted { drink, tx_hash });
        self.spawn_confirmation(drink, tx_hash);

        Ok(TickOutcome::Submitted { drink, tx_hash })
    }

    /// `barIsOpen`, and for the members variant also `onlyFins`.
    async fn bar_is_serving(&self) -> Result<bool, PollError> {
        let open = self
            .bar
            .bar_is_open()
            .await
            .map_err(PollError::at(TickStep::BarIsOpen))?;

        if !self.variant.requires_members_only() {
            return Ok(open);
        }

        let only_fins = self
            .bar
            .only_fins()
            .await
            .map_err(PollError::at(TickStep::OnlyFins))?;
        Ok(open && only_fins)
    }

    fn spawn_confirmation(&self, drink: U256, tx_hash: TxHash) {
        let bar = Arc::clone(&self.bar);
        let ledger = self.ledger.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            match bar.wait_for_receipt(tx_hash).await {
                Ok(receipt) => {
                    info!(
                        drink = %drink,
                        tx = %tx_hash,
                        block = receipt.block_number,
                        "transaction {} confirmed in block {}",
                        tx_hash,
                        receipt.block_number
                    );
                    ledger.confirmed(drink, receipt).await;
                    let _ = events.send(PollEvent::Confirmed { drink, receipt });
                }
                Err(e) => {
                    error!(drink = %drink, tx = %tx_hash, error = %e, "mint confirmation failed");
                    ledger.release(drink).await;
                    let _ = events.send(PollEvent::ConfirmationFailed {
                        drink,
                        tx_hash,
                        reason: e.to_string(),
                    });
                }
            }
        });
    }

    fn emit(&self, event: PollEvent) {
        let _ = self.events.send(event);
    }
}
