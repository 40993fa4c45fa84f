//! Admin controls
//!
//! Owner-gated parameter updates and emergency paths. `update_dev_addr` is
//! gated by the current dev address instead of the owner.

use alloy_primitives::{Address, U256};
use tracing::{info, warn};

use super::{Vault, VaultError, VaultEvent};
use crate::host::{Host, TokenLedger};

impl Vault {
    fn only_owner(&self, caller: Address) -> Result<(), VaultError> {
        if caller != self.params.owner {
            return Err(VaultError::Unauthorized {
                caller,
                required: self.params.owner,
            });
        }
        Ok(())
    }

    fn only_dev(&self, caller: Address) -> Result<(), VaultError> {
        if caller != self.params.dev_addr {
            return Err(VaultError::Unauthorized {
                caller,
                required: self.params.dev_addr,
            });
        }
        Ok(())
    }

    // ============================================
    // PARAMETERS
    // ============================================

    pub fn update_min_tokens_to_reinvest(&mut self, caller: Address, new: U256) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let old = std::mem::replace(&mut self.params.min_tokens_to_reinvest, new);
        self.emit(VaultEvent::UpdateMinTokensToReinvest { old, new });
        Ok(())
    }

    pub fn update_max_tokens_to_deposit_without_reinvest(
        &mut self,
        caller: Address,
        new: U256,
    ) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let old = std::mem::replace(&mut self.params.max_tokens_to_deposit_without_reinvest, new);
        self.emit(VaultEvent::UpdateMaxTokensToDepositWithoutReinvest { old, new });
        Ok(())
    }

    pub fn update_admin_fee(&mut self, caller: Address, bips: u64) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let fees = self.params.fees.with_admin_fee(bips)?;
        let old = self.params.fees.admin_fee_bips;
        self.params.fees = fees;
        self.emit(VaultEvent::UpdateAdminFee { old, new: bips });
        Ok(())
    }

    pub fn update_dev_fee(&mut self, caller: Address, bips: u64) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let fees = self.params.fees.with_dev_fee(bips)?;
        let old = self.params.fees.dev_fee_bips;
        self.params.fees = fees;
        self.emit(VaultEvent::UpdateDevFee { old, new: bips });
        Ok(())
    }

    pub fn update_reinvest_reward(&mut self, caller: Address, bips: u64) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let fees = self.params.fees.with_reinvest_reward(bips)?;
        let old = self.params.fees.reinvest_reward_bips;
        self.params.fees = fees;
        self.emit(VaultEvent::UpdateReinvestReward { old, new: bips });
        Ok(())
    }

    /// Setting the current value again is a no-op.
    pub fn update_deposits_enabled(&mut self, caller: Address, enabled: bool) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        if self.params.deposits_enabled != enabled {
            self.params.deposits_enabled = enabled;
            self.emit(VaultEvent::DepositsEnabled { enabled });
        }
        Ok(())
    }

    pub fn update_dev_addr(&mut self, caller: Address, new: Address) -> Result<(), VaultError> {
        self.only_dev(caller)?;
        let old = std::mem::replace(&mut self.params.dev_addr, new);
        self.emit(VaultEvent::UpdateDevAddr { old, new });
        Ok(())
    }

    pub fn transfer_ownership(&mut self, caller: Address, new: Address) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        if new.is_zero() {
            return Err(VaultError::ZeroAddress("owner"));
        }
        let previous = std::mem::replace(&mut self.params.owner, new);
        self.emit(VaultEvent::OwnershipTransferred { previous, new });
        Ok(())
    }

    /// Leaves the vault without an owner. Every owner-gated operation is
    /// permanently disabled afterwards.
    pub fn renounce_ownership(&mut self, caller: Address) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        let previous = std::mem::replace(&mut self.params.owner, Address::ZERO);
        self.emit(VaultEvent::OwnershipTransferred {
            previous,
            new: Address::ZERO,
        });
        Ok(())
    }

    // ============================================
    // ALLOWANCES
    // ============================================

    /// Re-grant the staking contract unlimited rights over the deposit token
    pub fn set_allowances<H: TokenLedger>(&mut self, host: &mut H, caller: Address) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        host.approve(
            self.config.deposit_token,
            self.config.address,
            self.config.staking_contract,
            U256::MAX,
        )?;
        Ok(())
    }

    pub fn revoke_allowance<H: TokenLedger>(
        &mut self,
        host: &mut H,
        caller: Address,
        token: Address,
        spender: Address,
    ) -> Result<(), VaultError> {
        self.only_owner(caller)?;
        host.approve(token, self.config.address, spender, U256::ZERO)?;
        info!("Revoked allowance of {:?} over {:?}", spender, token);
        Ok(())
    }

    // ============================================
    // RECOVERY
    // ============================================

    /// Sweep tokens sent to the vault by mistake to the owner.
    ///
    /// The deposit token is refused while shares exist, the reward token
    /// while deposits are enabled.
    pub fn recover_erc20<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), VaultError> {
        self.transact(host, "recoverERC20", |vault, host| {
            vault.only_owner(caller)?;
            if amount.is_zero() {
                return Err(VaultError::ZeroAmount);
            }
            let protected = (token == vault.config.deposit_token && !vault.ledger.total_supply().is_zero())
                || (token == vault.config.reward_token && vault.params.deposits_enabled);
            if protected {
                return Err(VaultError::ProtectedToken(token));
            }

            host.transfer(token, vault.config.address, vault.params.owner, amount)?;
            vault.emit(VaultEvent::Recovered { token, amount });
            info!("Recovered {} of {:?} to owner", amount, token);
            Ok(())
        })
    }

    /// Unstake the entire position back into the vault.
    ///
    /// Afterwards `total_deposits` matches the vault's liquid deposit-token
    /// balance. Returns the amount unstaked.
    pub fn rescue_deployed_funds<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        min_return_amount: U256,
        disable_deposits: bool,
    ) -> Result<U256, VaultError> {
        self.transact(host, "rescueDeployedFunds", |vault, host| {
            vault.only_owner(caller)?;
            let deposit_token = vault.config.deposit_token;
            let before = host.balance_of(deposit_token, vault.config.address);

            let staked = vault.staking.staked_balance(&*host);
            vault.staking.unstake(host, staked)?;

            let after = host.balance_of(deposit_token, vault.config.address);
            let returned = after.saturating_sub(before);
            if returned < min_return_amount {
                return Err(VaultError::RescueAmountTooLow {
                    returned,
                    minimum: min_return_amount,
                });
            }

            let baseline = if vault.ledger.total_supply().is_zero() {
                U256::ZERO
            } else {
                after
            };
            vault.ledger.reset_deposits(baseline);

            if disable_deposits && vault.params.deposits_enabled {
                vault.params.deposits_enabled = false;
                vault.emit(VaultEvent::DepositsEnabled { enabled: false });
            }

            warn!(
                "Rescued {} deployed tokens (deposits enabled: {})",
                returned, vault.params.deposits_enabled
            );
            Ok(returned)
        })
    }
}
