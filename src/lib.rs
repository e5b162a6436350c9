//! Bar drink minting bot.
//!
//! Polls the bar contract, works out which drink the current round pours,
//! and mints it once per round from the configured wallet.

pub mod config;
pub mod onchain;
pub mod poller;
pub mod round;
