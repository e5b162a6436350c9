//! The five bar contract calls the poller needs, behind a trait so the
//! polling loop can run against an in-memory bar in tests.

use crate::config::{ConfigError, Credentials};
use crate::onchain::abi::IBar::{self, IBarInstance};
use crate::onchain::types::{ContractError, MintReceipt};

use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider, ProviderBuilder};
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use std::future::Future;
use tracing::debug;

pub trait BarContract: Send + Sync + 'static {
    /// Address of the signing wallet.
    fn account(&self) -> Address;

    fn bar_is_open(&self) -> impl Future<Output = Result<bool, ContractError>> + Send;

    fn only_fins(&self) -> impl Future<Output = Result<bool, ContractError>> + Send;

    fn current_round(&self) -> impl Future<Output = Result<U256, ContractError>> + Send;

    fn balance_of(
        &self,
        account: Address,
        drink: U256,
    ) -> impl Future<Output = Result<U256, ContractError>> + Send;

    /// Submit `mint(referral)` paying `value` wei. Resolves once the node has
    /// accepted the transaction, not when it is mined.
    fn mint(
        &self,
        referral: Address,
        value: U256,
    ) -> impl Future<Output = Result<TxHash, ContractError>> + Send;

    /// Wait, without a timeout, for `tx_hash` to be mined.
    fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
    ) -> impl Future<Output = Result<MintReceipt, ContractError>> + Send;
}

/// Bar contract over an HTTP provider with the minting wallet attached.
/// Nonces, gas and chain id are filled in by the provider.
pub struct AlloyBar {
    provider: DynProvider,
    contract: IBarInstance<DynProvider>,
    account: Address,
}

impl AlloyBar {
    pub fn connect(credentials: &Credentials, address: Address) -> Result<Self, ConfigError> {
        let signer: PrivateKeySigner = credentials
            .private_key
            .parse()
            .map_err(|e| ConfigError::InvalidKey(format!("{e}")))?;
        let account = signer.address();

        let url: Url = credentials
            .rpc_url
            .parse()
            .map_err(|e| ConfigError::InvalidUrl(format!("{e}")))?;

        let provider = ProviderBuilder::new()
            .wallet(signer)
            .connect_http(url)
            .erased();
        let contract = IBar::new(address, provider.clone());

        Ok(Self {
            provider,
            contract,
            account,
        })
    }

    pub fn contract_address(&self) -> Address {
        *self.contract.address()
    }
}

impl BarContract for AlloyBar {
    fn account(&self) -> Address {
        self.account
    }

    async fn bar_is_open(&self) -> Result<bool, ContractError> {
        Ok(self.contract.barIsOpen().call().await?)
    }

    async fn only_fins(&self) -> Result<bool, ContractError> {
        Ok(self.contract.onlyFins().call().await?)
    }

    async fn current_round(&self) -> Result<U256, ContractError> {
        Ok(self.contract.currentRound().call().await?)
    }

    async fn balance_of(&self, account: Address, drink: U256) -> Result<U256, ContractError> {
        Ok(self.contract.balanceOf(account, drink).call().await?)
    }

    async fn mint(&self, referral: Address, value: U256) -> Result<TxHash, ContractError> {
        let pending = self.contract.mint(referral).value(value).send().await?;
        let tx_hash = *pending.tx_hash();
        debug!(tx = %tx_hash, "mint accepted by node");
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<MintReceipt, ContractError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .get_receipt()
            .await
            .map_err(|e| ContractError::Pending {
                tx_hash,
                reason: e.to_string(),
            })?;

        if !receipt.status() {
            return Err(ContractError::Reverted(tx_hash));
        }
        let block_number = receipt
            .block_number
            .ok_or(ContractError::MissingBlock(tx_hash))?;

        Ok(MintReceipt {
            tx_hash,
            block_number,
        })
    }
}
