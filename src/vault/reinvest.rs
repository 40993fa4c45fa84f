//! Reinvest Controller
//!
//! One harvest cycle per call, nothing persisted between calls:
//! `Idle -> Harvesting -> Distributing -> Converting -> Restaking -> Idle`.
//!
//! Fees are cut from the harvested reward token before conversion, so the
//! caller, owner and dev address are all paid in reward token and only the
//! principal goes through the swap route.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use super::{FeeSplit, Vault, VaultError, VaultEvent};
use crate::host::{Host, PairReader, StakingPool};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReinvestPhase {
    Idle,
    Harvesting,
    Distributing,
    Converting,
    Restaking,
}

impl ReinvestPhase {
    pub fn next(self) -> Self {
        match self {
            ReinvestPhase::Idle => ReinvestPhase::Harvesting,
            ReinvestPhase::Harvesting => ReinvestPhase::Distributing,
            ReinvestPhase::Distributing => ReinvestPhase::Converting,
            ReinvestPhase::Converting => ReinvestPhase::Restaking,
            ReinvestPhase::Restaking => ReinvestPhase::Idle,
        }
    }
}

impl fmt::Display for ReinvestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReinvestPhase::Idle => "idle",
            ReinvestPhase::Harvesting => "harvesting",
            ReinvestPhase::Distributing => "distributing",
            ReinvestPhase::Converting => "converting",
            ReinvestPhase::Restaking => "restaking",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of one committed reinvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReinvestReport {
    pub caller: Address,
    /// Reward token claimed from the staking pool
    pub harvested: U256,
    pub fees: FeeSplit,
    /// Deposit token added to the stake and to `total_deposits`
    pub restaked: U256,
    pub total_deposits: U256,
    pub total_supply: U256,
}

struct Cycle {
    phase: ReinvestPhase,
}

impl Cycle {
    fn start() -> Self {
        Self {
            phase: ReinvestPhase::Idle,
        }
    }

    fn advance(&mut self) {
        let next = self.phase.next();
        debug!("Reinvest: {} -> {}", self.phase, next);
        self.phase = next;
    }
}

impl Vault {
    /// Harvest, pay fees, convert and restake. Anyone may call this; the
    /// caller collects the reinvest reward.
    pub fn reinvest<H: Host>(&mut self, host: &mut H, caller: Address) -> Result<ReinvestReport, VaultError> {
        self.transact(host, "reinvest", |vault, host| {
            let pending = vault.check_reward(&*host);
            let minimum = vault.params.min_tokens_to_reinvest;
            if pending < minimum {
                return Err(VaultError::ThresholdNotMet { pending, minimum });
            }
            if vault.ledger.total_supply().is_zero() {
                return Err(VaultError::EmptyVault);
            }
            vault.compound(host, caller)
        })
    }

    /// Reward currently claimable from the staking pool
    pub fn check_reward<H: StakingPool + ?Sized>(&self, host: &H) -> U256 {
        self.staking.pending_reward(host)
    }

    /// Reward token a caller would receive from `reinvest` right now, zero
    /// while below the reinvest minimum.
    pub fn estimate_reinvest_reward<H: StakingPool + ?Sized>(&self, host: &H) -> U256 {
        let pending = self.check_reward(host);
        if pending < self.params.min_tokens_to_reinvest {
            return U256::ZERO;
        }
        self.params
            .fees
            .reinvest_reward_on(pending)
            .unwrap_or_default()
    }

    /// Staked balance plus the deposit-token value of pending reward net of
    /// fees. Never fails; an unquotable reward counts as zero.
    pub fn estimate_deployed_balance<H: StakingPool + PairReader + ?Sized>(&self, host: &H) -> U256 {
        let staked = self.staking.staked_balance(host);
        let pending = self.check_reward(host);
        let principal = self
            .params
            .fees
            .split(pending)
            .map(|split| split.principal)
            .unwrap_or_default();
        let value = self.router.quote(host, principal).unwrap_or_default();
        staked.saturating_add(value)
    }

    /// The reinvest cycle itself. Runs inside an enclosing `transact`.
    pub(super) fn compound<H: Host>(&mut self, host: &mut H, caller: Address) -> Result<ReinvestReport, VaultError> {
        let mut cycle = Cycle::start();
        let vault = self.config.address;
        let reward_token = self.config.reward_token;

        cycle.advance();
        let harvested = self.staking.claim(host)?;

        cycle.advance();
        let fees = self.params.fees.split(harvested)?;
        let payouts = [
            (caller, fees.reinvest_reward),
            (self.params.owner, fees.admin_fee),
            (self.params.dev_addr, fees.dev_fee),
        ];
        for (recipient, amount) in payouts {
            if !amount.is_zero() {
                host.transfer(reward_token, vault, recipient, amount)?;
            }
        }

        cycle.advance();
        let restaked = self.router.convert(host, vault, fees.principal)?;

        cycle.advance();
        self.ledger.add_deposits(restaked)?;
        self.staking.stake(host, restaked)?;

        cycle.advance();
        let report = ReinvestReport {
            caller,
            harvested,
            fees,
            restaked,
            total_deposits: self.ledger.total_deposits(),
            total_supply: self.ledger.total_supply(),
        };
        self.emit(VaultEvent::Reinvest {
            total_deposits: report.total_deposits,
            total_supply: report.total_supply,
        });

        info!(
            "Reinvest by {:?}: harvested {} (reward {}, admin {}, dev {}), restaked {}, total deposits {}",
            caller,
            harvested,
            fees.reinvest_reward,
            fees.admin_fee,
            fees.dev_fee,
            restaked,
            report.total_deposits
        );
        debug_assert_eq!(cycle.phase, ReinvestPhase::Idle);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testkit::*;
    use super::super::FeeSchedule;
    use super::*;
    use crate::host::{MemoryHost, TokenLedger};

    fn reference_fees() -> FeeSchedule {
        FeeSchedule::new(100, 100, 500).unwrap()
    }

    #[test]
    fn test_phase_cycle_returns_to_idle() {
        let mut phase = ReinvestPhase::Idle;
        let mut seen = vec![];
        for _ in 0..5 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                ReinvestPhase::Harvesting,
                ReinvestPhase::Distributing,
                ReinvestPhase::Converting,
                ReinvestPhase::Restaking,
                ReinvestPhase::Idle,
            ]
        );
    }

    #[test]
    fn test_reinvest_pays_caller_and_grows_deposits() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        host.distribute_rewards(STAKING, ether(10)).unwrap();

        let keeper = Address::repeat_byte(0xCC);
        let report = vault.reinvest(&mut host, keeper).unwrap();

        assert_eq!(report.harvested, ether(10));
        assert_eq!(host.balance_of(PNG, keeper), ether(10) * U256::from(500u64) / U256::from(10_000u64));
        assert_eq!(host.balance_of(PNG, OWNER), ether(10) / U256::from(100u64));
        assert_eq!(host.balance_of(PNG, DEPLOYER), ether(10) / U256::from(100u64));
        assert!(report.restaked > U256::ZERO);
        assert_eq!(vault.total_deposits(), ether(100) + report.restaked);
        assert_eq!(vault.total_supply(), ether(100));
        assert_eq!(host.staked_balance(STAKING, VAULT), vault.total_deposits());
        assert!(vault.check_reward(&host).is_zero());
    }

    #[test]
    fn test_reinvest_below_minimum_changes_nothing() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        vault
            .update_min_tokens_to_reinvest(OWNER, ether(50))
            .unwrap();
        host.distribute_rewards(STAKING, ether(10)).unwrap();

        let err = vault.reinvest(&mut host, BOB).unwrap_err();
        assert_eq!(
            err,
            VaultError::ThresholdNotMet {
                pending: ether(10),
                minimum: ether(50),
            }
        );
        assert_eq!(vault.total_deposits(), ether(100));
        assert_eq!(vault.check_reward(&host), ether(10));
        assert!(host.balance_of(PNG, BOB).is_zero());
    }

    #[test]
    fn test_reinvest_empty_vault() {
        let (mut host, mut vault) = setup(reference_fees());
        assert_eq!(
            vault.reinvest(&mut host, BOB).unwrap_err(),
            VaultError::EmptyVault
        );
    }

    #[test]
    fn test_share_price_rises_after_reinvest() {
        let (mut host, mut vault) = setup(FeeSchedule::default());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        let before = vault.get_deposit_tokens_for_shares(ether(1)).unwrap();

        host.distribute_rewards(STAKING, ether(40)).unwrap();
        vault.reinvest(&mut host, ALICE).unwrap();

        let after = vault.get_deposit_tokens_for_shares(ether(1)).unwrap();
        assert!(after > before);
    }

    #[test]
    fn test_estimates_track_pending_reward() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        assert_eq!(vault.estimate_deployed_balance(&host), ether(100));
        assert!(vault.estimate_reinvest_reward(&host).is_zero());

        host.distribute_rewards(STAKING, ether(10)).unwrap();
        assert_eq!(vault.estimate_reinvest_reward(&host), ether(10) / U256::from(20u64));

        let estimate = vault.estimate_deployed_balance(&host);
        let report = vault.reinvest(&mut host, BOB).unwrap();
        assert_eq!(estimate, ether(100) + report.restaked);
    }

    #[test]
    fn test_deployed_balance_survives_unreadable_route() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        host.distribute_rewards(STAKING, ether(10)).unwrap();
        assert!(vault.estimate_deployed_balance(&host) > ether(100));

        // Same position, but the swap pair is unknown to the reader
        let mut no_pair = MemoryHost::new();
        no_pair.add_pool(STAKING, WAVAX, PNG);
        no_pair.mint(WAVAX, VAULT, ether(100));
        no_pair.approve(WAVAX, VAULT, STAKING, U256::MAX).unwrap();
        no_pair.stake(STAKING, VAULT, ether(100)).unwrap();
        no_pair.distribute_rewards(STAKING, ether(10)).unwrap();
        assert_eq!(vault.check_reward(&no_pair), ether(10));
        assert_eq!(vault.estimate_deployed_balance(&no_pair), ether(100));

        // Pair drained to empty reserves
        host.add_pair(PAIR, WAVAX, PNG, U256::ZERO, U256::ZERO);
        assert_eq!(vault.estimate_deployed_balance(&host), ether(100));
    }

    #[test]
    fn test_deposit_triggers_implicit_reinvest() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        host.distribute_rewards(STAKING, ether(10)).unwrap();
        vault.take_events();

        vault.deposit(&mut host, BOB, ether(10)).unwrap();

        assert!(vault.check_reward(&host).is_zero());
        // Depositor triggered the reinvest, so collects the incentive
        assert_eq!(host.balance_of(PNG, BOB), ether(10) / U256::from(20u64));
        let events = vault.take_events();
        assert!(matches!(events.first(), Some(VaultEvent::Reinvest { .. })));
        // Priced after the reinvest, so Bob gets fewer than 1:1
        assert!(vault.balance_of(BOB) < ether(10));
    }

    #[test]
    fn test_deposit_under_max_skips_reinvest() {
        let (mut host, mut vault) = setup(reference_fees());
        vault.deposit(&mut host, ALICE, ether(100)).unwrap();
        vault
            .update_max_tokens_to_deposit_without_reinvest(OWNER, ether(20))
            .unwrap();
        host.distribute_rewards(STAKING, ether(10)).unwrap();

        vault.deposit(&mut host, BOB, ether(10)).unwrap();
        assert_eq!(vault.check_reward(&host), ether(10));
        assert_eq!(vault.balance_of(BOB), ether(10));
    }
}
