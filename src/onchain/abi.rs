//! Bar contract bindings and the runtime interface check.
//!
//! Calls go through the `sol!` bindings below. The JSON interface shipped
//! next to the binary is still loaded at startup so a stale or truncated
//! `abi.json` stops the bot before it spends anything.

use crate::config::ConfigError;
use alloy::json_abi::{JsonAbi, StateMutability};
use alloy::primitives::{address, Address, U256};
use alloy::sol;
use std::path::Path;

/// The bar contract on Ethereum mainnet.
pub const BAR_ADDRESS: Address = address!("99027c41f74b38862f53bda999881d8389fc6a92");

/// Interface description loaded at startup, relative to the working directory.
pub const INTERFACE_PATH: &str = "abi.json";

/// Referral passed to every mint.
pub const REFERRAL: Address = Address::ZERO;

/// 0.0001 ether.
pub const MINT_PRICE_WEI: u64 = 100_000_000_000_000;

const REQUIRED_FUNCTIONS: [&str; 5] = ["barIsOpen", "onlyFins", "currentRound", "balanceOf", "mint"];

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IBar {
        function barIsOpen() external view returns (bool);
        function onlyFins() external view returns (bool);
        function currentRound() external view returns (uint256);
        /// ERC-1155 balance of `account` for drink `id`
        function balanceOf(address account, uint256 id) external view returns (uint256);
        function mint(address referral) external payable;
    }
}

pub fn mint_price() -> U256 {
    U256::from(MINT_PRICE_WEI)
}

/// Read and validate the contract interface file.
pub fn load_interface(path: &Path) -> Result<JsonAbi, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::InterfaceIo {
        path: path.display().to_string(),
        source,
    })?;
    parse_interface(&contents)
}

/// Parse a JSON ABI and check it declares every function the poller calls.
pub fn parse_interface(json: &str) -> Result<JsonAbi, ConfigError> {
    let abi: JsonAbi = serde_json::from_str(json)?;

    for name in REQUIRED_FUNCTIONS {
        if !abi.functions.contains_key(name) {
            return Err(ConfigError::MissingFunction(name.to_string()));
        }
    }

    let mint_payable = abi
        .functions
        .get("mint")
        .map(|overloads| {
            overloads
                .iter()
                .any(|f| f.state_mutability == StateMutability::Payable)
        })
        .unwrap_or(false);
    if !mint_payable {
        return Err(ConfigError::NotPayable("mint".to_string()));
    }

    Ok(abi)
}

#[cfg(test)]
pub(crate) const TEST_INTERFACE: &str = r#"[
  {"type":"function","name":"barIsOpen","inputs":[],"outputs":[{"name":"","type":"bool"}],"stateMutability":"view"},
  {"type":"function","name":"onlyFins","inputs":[],"outputs":[{"name":"","type":"bool"}],"stateMutability":"view"},
  {"type":"function","name":"currentRound","inputs":[],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"balanceOf","inputs":[{"name":"account","type":"address"},{"name":"id","type":"uint256"}],"outputs":[{"name":"","type":"uint256"}],"stateMutability":"view"},
  {"type":"function","name":"mint","inputs":[{"name":"referral","type":"address"}],"outputs":[],"stateMutability":"payable"}
]"#;
