//! Fee Distributor
//!
//! Splits a harvested reward amount between the reinvest caller, the owner
//! (admin fee) and the dev address. Whatever remains is principal to restake.
//! All fees are taken in reward-token units, before conversion.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::VaultError;

/// 100% in basis points
pub const BIPS_DIVISOR: u64 = 10_000;

/// Fee rates in basis points. The combined rate never exceeds `BIPS_DIVISOR`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub admin_fee_bips: u64,
    pub dev_fee_bips: u64,
    pub reinvest_reward_bips: u64,
}

/// Result of splitting one harvest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSplit {
    /// Paid to whoever triggered the reinvest
    pub reinvest_reward: U256,
    /// Paid to the owner
    pub admin_fee: U256,
    /// Paid to the dev address
    pub dev_fee: U256,
    /// Left to convert and restake
    pub principal: U256,
}

impl FeeSchedule {
    pub fn new(admin_fee_bips: u64, dev_fee_bips: u64, reinvest_reward_bips: u64) -> Result<Self, VaultError> {
        let schedule = Self {
            admin_fee_bips,
            dev_fee_bips,
            reinvest_reward_bips,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn total_bips(&self) -> Option<u64> {
        self.admin_fee_bips
            .checked_add(self.dev_fee_bips)?
            .checked_add(self.reinvest_reward_bips)
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        match self.total_bips() {
            Some(total) if total <= BIPS_DIVISOR => Ok(()),
            _ => Err(VaultError::FeeBoundExceeded {
                admin: self.admin_fee_bips,
                dev: self.dev_fee_bips,
                reinvest: self.reinvest_reward_bips,
            }),
        }
    }

    pub fn with_admin_fee(self, bips: u64) -> Result<Self, VaultError> {
        Self::new(bips, self.dev_fee_bips, self.reinvest_reward_bips)
    }

    pub fn with_dev_fee(self, bips: u64) -> Result<Self, VaultError> {
        Self::new(self.admin_fee_bips, bips, self.reinvest_reward_bips)
    }

    pub fn with_reinvest_reward(self, bips: u64) -> Result<Self, VaultError> {
        Self::new(self.admin_fee_bips, self.dev_fee_bips, bips)
    }

    /// The caller's incentive on `amount` of reward.
    pub fn reinvest_reward_on(&self, amount: U256) -> Result<U256, VaultError> {
        bips_of(amount, self.reinvest_reward_bips)
    }

    /// Split `amount`, rounding each fee down so the principal keeps the dust.
    pub fn split(&self, amount: U256) -> Result<FeeSplit, VaultError> {
        let reinvest_reward = bips_of(amount, self.reinvest_reward_bips)?;
        let admin_fee = bips_of(amount, self.admin_fee_bips)?;
        let dev_fee = bips_of(amount, self.dev_fee_bips)?;

        let principal = amount
            .checked_sub(reinvest_reward)
            .and_then(|rest| rest.checked_sub(admin_fee))
            .and_then(|rest| rest.checked_sub(dev_fee))
            .ok_or(VaultError::ArithmeticOverflow)?;

        Ok(FeeSplit {
            reinvest_reward,
            admin_fee,
            dev_fee,
            principal,
        })
    }
}

fn bips_of(amount: U256, bips: u64) -> Result<U256, VaultError> {
    amount
        .checked_mul(U256::from(bips))
        .map(|scaled| scaled / U256::from(BIPS_DIVISOR))
        .ok_or(VaultError::ArithmeticOverflow)
}
