//! In-memory bar contract for poller and scheduler tests.

use crate::onchain::{BarContract, ContractError, MintReceipt};
use crate::poller::TickStep;
use crate::round;

use alloy::primitives::{Address, TxHash, U256};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, Copy)]
pub struct RecordedMint {
    pub referral: Address,
    pub value: U256,
    pub drink: U256,
    pub tx_hash: TxHash,
}

#[derive(Debug, Default)]
struct State {
    open: bool,
    only_fins: bool,
    round: u64,
    balances: HashMap<U256, U256>,
    mints: Vec<RecordedMint>,
    pending: HashMap<TxHash, U256>,
    calls: HashMap<&'static str, usize>,
    fail_next: Option<TickStep>,
    revert: bool,
}

/// Bar whose flags, round and balances are set by the test. Mints stay
/// pending until `release_confirmations` lets them land.
pub struct FakeBar {
    account: Address,
    state: Mutex<State>,
    confirmations: Semaphore,
}

impl FakeBar {
    /// An open, members-only bar at `round`.
    pub fn open(round: u64) -> Self {
        Self {
            account: Address::repeat_byte(0x42),
            state: Mutex::new(State {
                open: true,
                only_fins: true,
                round,
                ..State::default()
            }),
            confirmations: Semaphore::new(0),
        }
    }

    pub fn set_open(&self, open: bool) {
        self.state.lock().unwrap().open = open;
    }

    pub fn set_only_fins(&self, only_fins: bool) {
        self.state.lock().unwrap().only_fins = only_fins;
    }

    pub fn set_balance(&self, drink: U256, balance: U256) {
        self.state.lock().unwrap().balances.insert(drink, balance);
    }

    /// Make the next call for `step` fail with an RPC error.
    pub fn fail_next(&self, step: TickStep) {
        self.state.lock().unwrap().fail_next = Some(step);
    }

    /// Report confirmed mints as reverted.
    pub fn revert_confirmations(&self, revert: bool) {
        self.state.lock().unwrap().revert = revert;
    }

    pub fn release_confirmations(&self, n: usize) {
        self.confirmations.add_permits(n);
    }

    pub fn mints(&self) -> Vec<RecordedMint> {
        self.state.lock().unwrap().mints.clone()
    }

    pub fn calls(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.get(name).copied().unwrap_or(0)
    }

    fn record(&self, name: &'static str, step: TickStep) -> Result<(), ContractError> {
        let mut state = self.state.lock().unwrap();
        *state.calls.entry(name).or_default() += 1;
        if state.fail_next == Some(step) {
            state.fail_next = None;
            return Err(ContractError::Rpc(format!("{name}: connection reset")));
        }
        Ok(())
    }
}

impl BarContract for FakeBar {
    fn account(&self) -> Address {
        self.account
    }

    async fn bar_is_open(&self) -> Result<bool, ContractError> {
        self.record("barIsOpen", TickStep::BarIsOpen)?;
        Ok(self.state.lock().unwrap().open)
    }

    async fn only_fins(&self) -> Result<bool, ContractError> {
        self.record("onlyFins", TickStep::OnlyFins)?;
        Ok(self.state.lock().unwrap().only_fins)
    }

    async fn current_round(&self) -> Result<U256, ContractError> {
        self.record("currentRound", TickStep::CurrentRound)?;
        Ok(U256::from(self.state.lock().unwrap().round))
    }

    async fn balance_of(&self, account: Address, drink: U256) -> Result<U256, ContractError> {
        self.record("balanceOf", TickStep::BalanceOf)?;
        assert_eq!(account, self.account);
        Ok(self
            .state
            .lock()
            .unwrap()
            .balances
            .get(&drink)
            .copied()
            .unwrap_or(U256::ZERO))
    }

    async fn mint(&self, referral: Address, value: U256) -> Result<TxHash, ContractError> {
        self.record("mint", TickStep::Mint)?;
        let mut state = self.state.lock().unwrap();
        let drink = round::drink_for_round(U256::from(state.round))
            .ok_or_else(|| ContractError::Rpc("execution reverted".to_string()))?;
        let tx_hash = TxHash::with_last_byte(state.mints.len() as u8 + 1);
        state.mints.push(RecordedMint {
            referral,
            value,
            drink,
            tx_hash,
        });
        state.pending.insert(tx_hash, drink);
        Ok(tx_hash)
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<MintReceipt, ContractError> {
        self.confirmations
            .acquire()
            .await
            .map_err(|e| ContractError::Rpc(e.to_string()))?
            .forget();

        let mut state = self.state.lock().unwrap();
        if state.revert {
            return Err(ContractError::Reverted(tx_hash));
        }
        let drink = state
            .pending
            .remove(&tx_hash)
            .ok_or(ContractError::MissingBlock(tx_hash))?;
        *state.balances.entry(drink).or_insert(U256::ZERO) += U256::from(1);

        Ok(MintReceipt {
            tx_hash,
            block_number: 19_000_000 + state.mints.len() as u64,
        })
    }
}
