//! Results and errors returned by the bar contract wrapper.

use alloy::primitives::TxHash;
use thiserror::Error;

/// A mint transaction that made it into a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
}

/// Failures talking to the chain. All of these are worth retrying on the
/// next tick.
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("contract call failed: {0}")]
    Call(#[from] alloy::contract::Error),
    #[error("waiting for transaction {tx_hash} failed: {reason}")]
    Pending { tx_hash: TxHash, reason: String },
    #[error("transaction {0} reverted")]
    Reverted(TxHash),
    #[error("receipt for transaction {0} has no block number")]
    MissingBlock(TxHash),
    #[error("rpc error: {0}")]
    Rpc(String),
}
