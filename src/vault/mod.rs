//! The Vault
//!
//! Depositors lock the deposit token and receive shares. The vault stakes
//! everything with the rewards pool, and periodically reinvests the reward
//! token back into the deposit token, growing the value of each share.
//!
//! Responsible for:
//! - Share accounting (`shares`)
//! - Staking pass-through (`staking`)
//! - Fee splitting (`fees`)
//! - Harvest/convert/restake cycles (`reinvest`)
//! - Owner-gated parameters and emergency paths (`admin`)
//!
//! Every public mutating operation is all-or-nothing: on error both the vault
//! and the host are restored to their state before the call.

mod admin;
mod error;
mod events;
mod fees;
mod params;
mod reinvest;
mod shares;
mod staking;

pub use error::VaultError;
pub use events::{EventRecord, VaultEvent};
pub use fees::{FeeSchedule, FeeSplit, BIPS_DIVISOR};
pub use params::{VaultConfig, VaultInit, VaultParameters};
pub use reinvest::{ReinvestPhase, ReinvestReport};
pub use shares::{ShareLedger, SHARE_DECIMALS, SHARE_SYMBOL};
pub use staking::StakingAdapter;

use alloy_primitives::{Address, U256};
use tracing::{debug, info, warn};

use crate::host::Host;
use crate::router::SwapRouter;

#[derive(Debug, Clone)]
pub struct Vault {
    config: VaultConfig,
    params: VaultParameters,
    ledger: ShareLedger,
    staking: StakingAdapter,
    router: SwapRouter,
    events: Vec<VaultEvent>,
}

impl Vault {
    /// Deploy a vault. `deployer` becomes the dev fee recipient.
    ///
    /// Resolves the conversion route and grants the staking contract an
    /// unlimited allowance over the vault's deposit token.
    pub fn deploy<H: Host>(host: &mut H, deployer: Address, init: VaultInit) -> Result<Self, VaultError> {
        let VaultInit {
            config,
            owner,
            min_tokens_to_reinvest,
            fees,
        } = init;
        fees.validate()?;
        if owner.is_zero() {
            return Err(VaultError::ZeroAddress("owner"));
        }

        let router = SwapRouter::resolve(
            &*host,
            config.reward_token,
            config.deposit_token,
            config.swap_pair0,
            config.swap_pair1,
        )?;
        let staking = StakingAdapter::new(config.staking_contract, config.address);

        host.approve(
            config.deposit_token,
            config.address,
            config.staking_contract,
            U256::MAX,
        )?;

        info!(
            "Deployed vault \"{}\" at {:?} ({}-hop route, owner {:?})",
            config.name,
            config.address,
            router.hops().len(),
            owner
        );

        Ok(Self {
            params: VaultParameters {
                min_tokens_to_reinvest,
                max_tokens_to_deposit_without_reinvest: U256::ZERO,
                fees,
                deposits_enabled: true,
                dev_addr: deployer,
                owner,
            },
            ledger: ShareLedger::new(),
            staking,
            router,
            events: vec![VaultEvent::OwnershipTransferred {
                previous: Address::ZERO,
                new: owner,
            }],
            config,
        })
    }

    // ============================================
    // VIEWS
    // ============================================

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn params(&self) -> &VaultParameters {
        &self.params
    }

    pub fn router(&self) -> &SwapRouter {
        &self.router
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn symbol(&self) -> &'static str {
        SHARE_SYMBOL
    }

    pub fn decimals(&self) -> u8 {
        SHARE_DECIMALS
    }

    pub fn owner(&self) -> Address {
        self.params.owner
    }

    pub fn total_supply(&self) -> U256 {
        self.ledger.total_supply()
    }

    pub fn total_deposits(&self) -> U256 {
        self.ledger.total_deposits()
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.ledger.balance_of(account)
    }

    /// Accounts currently holding shares
    pub fn holder_count(&self) -> usize {
        self.ledger.holder_count()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.ledger.allowance(owner, spender)
    }

    pub fn get_shares_for_deposit_tokens(&self, amount: U256) -> Result<U256, VaultError> {
        self.ledger.shares_for_deposit(amount)
    }

    pub fn get_deposit_tokens_for_shares(&self, shares: U256) -> Result<U256, VaultError> {
        self.ledger.deposit_tokens_for_shares(shares)
    }

    /// Events recorded since the last `take_events`
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }

    // ============================================
    // DEPOSIT / WITHDRAW
    // ============================================

    /// Deposit `amount` of the caller's deposit tokens; returns shares minted.
    pub fn deposit<H: Host>(&mut self, host: &mut H, caller: Address, amount: U256) -> Result<U256, VaultError> {
        self.transact(host, "deposit", |vault, host| {
            vault.deposit_from(host, caller, caller, amount)
        })
    }

    /// Deposit the caller's tokens and mint the shares to `account`.
    pub fn deposit_for<H: Host>(
        &mut self,
        host: &mut H,
        caller: Address,
        account: Address,
        amount: U256,
    ) -> Result<U256, VaultError> {
        self.transact(host, "depositFor", |vault, host| {
            vault.deposit_from(host, caller, account, amount)
        })
    }

    fn deposit_from<H: Host>(
        &mut self,
        host: &mut H,
        payer: Address,
        account: Address,
        amount: U256,
    ) -> Result<U256, VaultError> {
        if !self.params.deposits_enabled {
            return Err(VaultError::DepositsDisabled);
        }
        if amount.is_zero() {
            return Err(VaultError::ZeroAmount);
        }

        if !self.ledger.total_supply().is_zero() {
            let pending = self.check_reward(&*host);
            if pending > self.params.max_tokens_to_deposit_without_reinvest {
                debug!(
                    "Pending reward {} above {}, reinvesting before deposit",
                    pending, self.params.max_tokens_to_deposit_without_reinvest
                );
                self.compound(host, payer)?;
            }
        }

        // Priced on totals before this deposit is staked
        let shares = self.ledger.shares_for_deposit(amount)?;
        if shares.is_zero() {
            return Err(VaultError::ZeroShares(amount));
        }

        self.ledger.mint(account, shares)?;
        self.ledger.add_deposits(amount)?;
        self.emit(VaultEvent::Transfer {
            from: Address::ZERO,
            to: account,
            value: shares,
        });
        self.emit(VaultEvent::Deposit { account, amount });

        let vault = self.config.address;
        host.transfer_from(self.config.deposit_token, vault, payer, vault, amount)?;
        self.staking.stake(host, amount)?;

        info!(
            "Deposit: {} tokens from {:?} -> {} shares for {:?}",
            amount, payer, shares, account
        );
        Ok(shares)
    }

    /// Redeem `shares` for deposit tokens; returns the amount paid out.
    ///
    /// Shares worth zero tokens are left untouched.
    pub fn withdraw<H: Host>(&mut self, host: &mut H, caller: Address, shares: U256) -> Result<U256, VaultError> {
        self.transact(host, "withdraw", |vault, host| {
            let available = vault.ledger.balance_of(caller);
            if shares > available {
                return Err(VaultError::InsufficientShares {
                    requested: shares,
                    available,
                });
            }

            let amount = vault.ledger.deposit_tokens_for_shares(shares)?;
            if amount.is_zero() {
                debug!("Withdraw of {} shares is worth nothing, skipping", shares);
                return Ok(U256::ZERO);
            }

            vault.ledger.burn(caller, shares)?;
            vault.ledger.remove_deposits(amount)?;
            vault.emit(VaultEvent::Transfer {
                from: caller,
                to: Address::ZERO,
                value: shares,
            });
            vault.emit(VaultEvent::Withdraw {
                account: caller,
                amount,
            });

            let deposit_token = vault.config.deposit_token;
            vault.staking.release(host, deposit_token, amount)?;
            host.transfer(deposit_token, vault.config.address, caller, amount)?;

            info!("Withdraw: {} shares -> {} tokens to {:?}", shares, amount, caller);
            Ok(amount)
        })
    }

    // ============================================
    // SHARE TOKEN
    // ============================================

    pub fn transfer(&mut self, caller: Address, to: Address, shares: U256) -> Result<(), VaultError> {
        self.ledger.transfer(caller, to, shares)?;
        self.emit(VaultEvent::Transfer {
            from: caller,
            to,
            value: shares,
        });
        Ok(())
    }

    pub fn approve(&mut self, caller: Address, spender: Address, shares: U256) {
        self.ledger.approve(caller, spender, shares);
        self.emit(VaultEvent::Approval {
            owner: caller,
            spender,
            value: shares,
        });
    }

    /// Move `shares` from `from` to `to` using the caller's allowance.
    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        shares: U256,
    ) -> Result<(), VaultError> {
        let available = self.ledger.balance_of(from);
        if available < shares {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                available,
            });
        }
        self.ledger.spend_allowance(from, caller, shares)?;
        self.ledger.transfer(from, to, shares)?;
        self.emit(VaultEvent::Transfer {
            from,
            to,
            value: shares,
        });
        Ok(())
    }

    // ============================================
    // INTERNALS
    // ============================================

    fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    /// Run `op` against checkpoints of the vault and host, restoring both if
    /// it fails.
    fn transact<H, T, F>(&mut self, host: &mut H, operation: &'static str, op: F) -> Result<T, VaultError>
    where
        H: Host,
        F: FnOnce(&mut Self, &mut H) -> Result<T, VaultError>,
    {
        let vault_checkpoint = self.clone();
        let host_checkpoint = host.clone();

        let result = op(self, host);
        if let Err(e) = &result {
            *self = vault_checkpoint;
            *host = host_checkpoint;
            warn!("{} reverted: {}", operation, e);
        }
        result
    }
}

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared fixture: a PNG-rewarded WAVAX vault with a one-hop route.

    use super::*;
    use crate::host::MemoryHost;

    pub const OWNER: Address = Address::repeat_byte(0xE0);
    pub const DEPLOYER: Address = Address::repeat_byte(0xD0);
    pub const ALICE: Address = Address::repeat_byte(0xA0);
    pub const BOB: Address = Address::repeat_byte(0xB0);

    pub const VAULT: Address = Address::repeat_byte(0x77);
    pub const WAVAX: Address = Address::repeat_byte(0x22);
    pub const PNG: Address = Address::repeat_byte(0x11);
    pub const STAKING: Address = Address::repeat_byte(0x50);
    pub const PAIR: Address = Address::repeat_byte(0x41);

    pub fn ether(n: u64) -> U256 {
        U256::from(n) * U256::from(10u64).pow(U256::from(18))
    }

    pub fn setup(fees: FeeSchedule) -> (MemoryHost, Vault) {
        let mut host = MemoryHost::new();
        host.add_pool(STAKING, WAVAX, PNG);
        host.add_pair(PAIR, WAVAX, PNG, ether(1_000_000), ether(4_000_000));
        for who in [ALICE, BOB] {
            host.mint(WAVAX, who, ether(1_000));
            crate::host::TokenLedger::approve(&mut host, WAVAX, who, VAULT, U256::MAX).unwrap();
        }

        let vault = Vault::deploy(
            &mut host,
            DEPLOYER,
            VaultInit {
                config: VaultConfig {
                    name: "Yield Yak: WAVAX".to_string(),
                    address: VAULT,
                    deposit_token: WAVAX,
                    reward_token: PNG,
                    staking_contract: STAKING,
                    swap_pair0: Some(PAIR),
                    swap_pair1: None,
                },
                owner: OWNER,
                min_tokens_to_reinvest: U256::ZERO,
                fees,
            },
        )
        .unwrap();
        (host, vault)
    }
}
