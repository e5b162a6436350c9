//! Which drink is being poured for a given on-chain round.
//!
//! Mirrors `_drinkToMint` on the bar contract: a new drink every five rounds,
//! counting down from 15. This is an assumption about the deployed contract,
//! not something read from chain; if it drifts, mints revert or go to the
//! wrong drink.

use alloy::primitives::U256;

/// Drink id handed out in round 0.
pub const ROUND_DURATION: u64 = 15;

/// Rounds served per drink.
pub const ROUNDS_PER_DRINK: u64 = 5;

/// `15 - floor(round / 5)`, signed. Goes negative once round 80 is reached.
pub fn drink_index(round: U256) -> i128 {
    let served = round / U256::from(ROUNDS_PER_DRINK);
    let served = u64::try_from(served).map(i128::from).unwrap_or(i128::MAX);
    ROUND_DURATION as i128 - served
}

/// The drink to mint in `round`, or `None` once the menu has run out.
pub fn drink_for_round(round: U256) -> Option<U256> {
    U256::from(ROUND_DURATION).checked_sub(round / U256::from(ROUNDS_PER_DRINK))
}
