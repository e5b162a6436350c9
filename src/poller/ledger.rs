//! Per-drink mint state shared between the tick path and the confirmation
//! tasks it spawns.

use crate::onchain::MintReceipt;
use alloy::primitives::{TxHash, U256};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MintState {
    Idle,
    /// A mint call is on its way to the node.
    Submitting,
    PendingConfirmation(TxHash),
    Confirmed(MintReceipt),
    /// The bar closed; nothing will be minted again.
    Closed,
}

impl MintState {
    /// States in which a new mint for the same drink must not be sent.
    pub fn blocks_mint(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Debug, Default)]
struct LedgerInner {
    drinks: HashMap<U256, MintState>,
    closed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MintLedger {
    inner: Arc<Mutex<LedgerInner>>,
}

impl MintLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn state(&self, drink: U256) -> MintState {
        let inner = self.inner.lock().await;
        if inner.closed {
            return MintState::Closed;
        }
        inner.drinks.get(&drink).copied().unwrap_or(MintState::Idle)
    }

    /// Claim `drink` for submission. Returns the blocking state if a mint is
    /// already outstanding or done, or if the bar has closed.
    pub async fn try_begin(&self, drink: U256) -> Result<(), MintState> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(MintState::Closed);
        }
        let state = inner.drinks.entry(drink).or_insert(MintState::Idle);
        if state.blocks_mint() {
            return Err(*state);
        }
        *state = MintState::Submitting;
        Ok(())
    }

    pub async fn submitted(&self, drink: U256, tx_hash: TxHash) {
        self.set(drink, MintState::PendingConfirmation(tx_hash)).await;
    }

    pub async fn confirmed(&self, drink: U256, receipt: MintReceipt) {
        self.set(drink, MintState::Confirmed(receipt)).await;
    }

    /// Hand `drink` back after a failed submit or confirmation.
    pub async fn release(&self, drink: U256) {
        self.set(drink, MintState::Idle).await;
    }

    pub async fn close(&self) {
        self.inner.lock().await.closed = true;
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.closed
    }

    async fn set(&self, drink: U256, state: MintState) {
        self.inner.lock().await.drinks.insert(drink, state);
    }
}
