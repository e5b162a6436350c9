//! On-chain access to the bar contract on Ethereum mainnet.
//!
//! - `abi`: `sol!` bindings, contract constants, and the startup check of
//!   the JSON interface file
//! - `client`: the `BarContract` trait the poller is written against, and
//!   `AlloyBar`, its implementation over an HTTP provider with a local signer
//! - `types`: receipts and the `ContractError` taxonomy

pub mod abi;
pub mod client;
pub mod types;

pub use client::{AlloyBar, BarContract};
pub use types::{ContractError, MintReceipt};
