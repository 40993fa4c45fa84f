//! Staking Adapter
//!
//! Thin pass-through to the rewards-staking contract on behalf of the vault.
//! Collaborator failures propagate unchanged.

use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::host::{HostError, StakingPool, TokenLedger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakingAdapter {
    pool: Address,
    vault: Address,
}

impl StakingAdapter {
    pub fn new(pool: Address, vault: Address) -> Self {
        Self { pool, vault }
    }

    pub fn pool(&self) -> Address {
        self.pool
    }

    pub fn stake<H: StakingPool>(&self, host: &mut H, amount: U256) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        debug!("Staking {} with {:?}", amount, self.pool);
        host.stake(self.pool, self.vault, amount)
    }

    pub fn unstake<H: StakingPool>(&self, host: &mut H, amount: U256) -> Result<(), HostError> {
        if amount.is_zero() {
            return Ok(());
        }
        debug!("Unstaking {} from {:?}", amount, self.pool);
        host.withdraw(self.pool, self.vault, amount)
    }

    /// Make `amount` of deposit token liquid in the vault, using idle balance
    /// first and unstaking only the shortfall.
    pub fn release<H: StakingPool + TokenLedger>(
        &self,
        host: &mut H,
        deposit_token: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let idle = host.balance_of(deposit_token, self.vault);
        self.unstake(host, amount.saturating_sub(idle))
    }

    /// Claim everything earned; returns the amount received.
    pub fn claim<H: StakingPool>(&self, host: &mut H) -> Result<U256, HostError> {
        host.get_reward(self.pool, self.vault)
    }

    pub fn pending_reward<H: StakingPool + ?Sized>(&self, host: &H) -> U256 {
        host.earned(self.pool, self.vault)
    }

    pub fn staked_balance<H: StakingPool + ?Sized>(&self, host: &H) -> U256 {
        host.staked_balance(self.pool, self.vault)
    }
}
