//! Tick outcomes, errors, and the events the poller emits.

use crate::onchain::{ContractError, MintReceipt};
use crate::poller::ledger::MintState;
use alloy::primitives::{TxHash, U256};
use thiserror::Error;

/// The contract call a tick was making when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStep {
    BarIsOpen,
    OnlyFins,
    CurrentRound,
    BalanceOf,
    Mint,
}

impl std::fmt::Display for TickStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::BarIsOpen => "barIsOpen",
            Self::OnlyFins => "onlyFins",
            Self::CurrentRound => "currentRound",
            Self::BalanceOf => "balanceOf",
            Self::Mint => "mint",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{step} failed: {source}")]
pub struct PollError {
    pub step: TickStep,
    #[source]
    pub source: ContractError,
}

impl PollError {
    pub fn at(step: TickStep) -> impl FnOnce(ContractError) -> Self {
        move |source| Self { step, source }
    }
}

/// What a single tick decided. None of these are failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The bar is closed; polling should stop for good.
    BarClosed,
    /// The round counter is past the last drink.
    MenuExhausted { round: U256 },
    /// The wallet already holds this round's drink.
    AlreadyMinted { drink: U256 },
    /// A mint for this drink is still outstanding from an earlier tick.
    InFlight { drink: U256, state: MintState },
    /// A mint was sent; its confirmation is tracked separately.
    Submitted { drink: U256, tx_hash: TxHash },
}

/// Events emitted by the poller, consumed by the main loop.
#[derive(Debug, Clone)]
pub enum PollEvent {
    BarClosed,
    MenuExhausted {
        round: U256,
    },
    AlreadyMinted {
        drink: U256,
    },
    Submitted {
        drink: U256,
        tx_hash: TxHash,
    },
    Confirmed {
        drink: U256,
        receipt: MintReceipt,
    },
    ConfirmationFailed {
        drink: U256,
        tx_hash: TxHash,
        reason: String,
    },
    /// A tick failed. `fatal` means polling has stopped because of it.
    TickFailed {
        step: TickStep,
        reason: String,
        fatal: bool,
    },
}

impl std::fmt::Display for PollEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BarClosed => write!(f, "BarClosed"),
            Self::MenuExhausted { round } => write!(f, "MenuExhausted(round={})", round),
            Self::AlreadyMinted { drink } => write!(f, "AlreadyMinted(drink={})", drink),
            Self::Submitted { drink, tx_hash } => {
                write!(f, "Submitted(drink={}, tx={})", drink, tx_hash)
            }
            Self::Confirmed { drink, receipt } => write!(
                f,
                "Confirmed(drink={}, block={})",
                drink, receipt.block_number
            ),
            Self::ConfirmationFailed { drink, reason, .. } => {
                write!(f, "ConfirmationFailed(drink={}, {})", drink, reason)
            }
            Self::TickFailed { step, reason, fatal } => {
                write!(f, "TickFailed({}: {}, fatal={})", step, reason, fatal)
            }
        }
    }
}
