//! Offline vault simulation
//!
//! Deploys a vault on a `MemoryHost` with a PNG-style reward pool and a
//! single reward/deposit pair, then plays out a deposit schedule over a
//! number of reward epochs. A keeper reinvests whenever the vault accepts it.
//! Every depositor exits at the end, so the report shows what compounding
//! returned on top of principal.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::{MemoryHost, TokenLedger};
use crate::vault::{FeeSchedule, Vault, VaultConfig, VaultError, VaultEvent, VaultInit};

pub const VAULT: Address = Address::repeat_byte(0x77);
pub const DEPOSIT_TOKEN: Address = Address::repeat_byte(0x22);
pub const REWARD_TOKEN: Address = Address::repeat_byte(0x11);
pub const STAKING_CONTRACT: Address = Address::repeat_byte(0x50);
pub const SWAP_PAIR: Address = Address::repeat_byte(0x41);
pub const KEEPER: Address = Address::repeat_byte(0xCC);

fn one_token() -> U256 {
    U256::from(10u64).pow(U256::from(18))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParams {
    pub vault_name: String,
    pub owner: Address,
    pub deployer: Address,
    pub depositors: usize,
    /// First deposit of each depositor; the n-th depositor deposits n times this
    pub deposit: U256,
    pub epochs: usize,
    pub reward_per_epoch: U256,
    /// Pair reserves as (deposit token, reward token)
    pub liquidity: (U256, U256),
    pub fees: FeeSchedule,
    pub min_tokens_to_reinvest: U256,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            vault_name: "Simulated Vault".to_string(),
            owner: Address::repeat_byte(0xE0),
            deployer: Address::repeat_byte(0xD0),
            depositors: 3,
            deposit: one_token() * U256::from(100u64),
            epochs: 12,
            reward_per_epoch: one_token() * U256::from(25u64),
            liquidity: (
                one_token() * U256::from(1_000_000u64),
                one_token() * U256::from(4_000_000u64),
            ),
            fees: FeeSchedule {
                admin_fee_bips: 100,
                dev_fee_bips: 100,
                reinvest_reward_bips: 500,
            },
            min_tokens_to_reinvest: U256::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochReport {
    pub epoch: usize,
    pub reinvested: bool,
    pub harvested: U256,
    pub restaked: U256,
    pub total_deposits: U256,
    pub total_supply: U256,
    pub holders: usize,
    /// Deposit tokens redeemable for one whole share
    pub share_price: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositorOutcome {
    pub account: Address,
    pub deposited: U256,
    pub withdrawn: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub epochs: Vec<EpochReport>,
    pub depositors: Vec<DepositorOutcome>,
    pub keeper_rewards: U256,
    pub admin_fees: U256,
    pub dev_fees: U256,
    pub events: Vec<VaultEvent>,
}

impl SimulationReport {
    pub fn total_deposited(&self) -> U256 {
        self.depositors.iter().map(|d| d.deposited).fold(U256::ZERO, |a, b| a + b)
    }

    pub fn total_withdrawn(&self) -> U256 {
        self.depositors.iter().map(|d| d.withdrawn).fold(U256::ZERO, |a, b| a + b)
    }

    pub fn reinvest_count(&self) -> usize {
        self.epochs.iter().filter(|e| e.reinvested).count()
    }
}

fn depositor(index: usize) -> Address {
    Address::left_padding_from(&(0xA000u64 + index as u64).to_be_bytes())
}

pub fn run(params: &SimulationParams) -> Result<SimulationReport, VaultError> {
    let mut host = MemoryHost::new();
    host.add_pool(STAKING_CONTRACT, DEPOSIT_TOKEN, REWARD_TOKEN);
    host.add_pair(
        SWAP_PAIR,
        DEPOSIT_TOKEN,
        REWARD_TOKEN,
        params.liquidity.0,
        params.liquidity.1,
    );

    let mut vault = Vault::deploy(
        &mut host,
        params.deployer,
        VaultInit {
            config: VaultConfig {
                name: params.vault_name.clone(),
                address: VAULT,
                deposit_token: DEPOSIT_TOKEN,
                reward_token: REWARD_TOKEN,
                staking_contract: STAKING_CONTRACT,
                swap_pair0: Some(SWAP_PAIR),
                swap_pair1: None,
            },
            owner: params.owner,
            min_tokens_to_reinvest: params.min_tokens_to_reinvest,
            fees: params.fees,
        },
    )?;

    let mut outcomes: Vec<DepositorOutcome> = (0..params.depositors)
        .map(|i| DepositorOutcome {
            account: depositor(i),
            deposited: U256::ZERO,
            withdrawn: U256::ZERO,
        })
        .collect();
    for (i, outcome) in outcomes.iter().enumerate() {
        let amount = params.deposit * U256::from(i as u64 + 1);
        host.mint(DEPOSIT_TOKEN, outcome.account, amount);
        host.approve(DEPOSIT_TOKEN, outcome.account, VAULT, U256::MAX)?;
    }

    let mut epochs = Vec::with_capacity(params.epochs);
    for epoch in 0..params.epochs {
        // Depositors join one per epoch
        if let Some(outcome) = outcomes.get_mut(epoch) {
            let amount = params.deposit * U256::from(epoch as u64 + 1);
            vault.deposit(&mut host, outcome.account, amount)?;
            outcome.deposited = amount;
        }

        host.distribute_rewards(STAKING_CONTRACT, params.reward_per_epoch)?;

        let report = match vault.reinvest(&mut host, KEEPER) {
            Ok(report) => Some(report),
            Err(VaultError::ThresholdNotMet { pending, minimum }) => {
                debug!("Epoch {}: pending {} below {}, skipping", epoch, pending, minimum);
                None
            }
            Err(VaultError::EmptyVault) => None,
            Err(e) => return Err(e),
        };

        epochs.push(EpochReport {
            epoch,
            reinvested: report.is_some(),
            harvested: report.as_ref().map(|r| r.harvested).unwrap_or_default(),
            restaked: report.as_ref().map(|r| r.restaked).unwrap_or_default(),
            total_deposits: vault.total_deposits(),
            total_supply: vault.total_supply(),
            holders: vault.holder_count(),
            share_price: vault.get_deposit_tokens_for_shares(one_token())?,
        });
    }

    for outcome in outcomes.iter_mut() {
        let shares = vault.balance_of(outcome.account);
        if !shares.is_zero() {
            outcome.withdrawn = vault.withdraw(&mut host, outcome.account, shares)?;
        }
    }

    let report = SimulationReport {
        epochs,
        keeper_rewards: host.balance_of(REWARD_TOKEN, KEEPER),
        admin_fees: host.balance_of(REWARD_TOKEN, params.owner),
        dev_fees: host.balance_of(REWARD_TOKEN, params.deployer),
        events: vault.take_events(),
        depositors: outcomes,
    };

    info!(
        "Simulation finished: {} epochs, {} reinvests, deposited {}, withdrawn {}",
        report.epochs.len(),
        report.reinvest_count(),
        report.total_deposited(),
        report.total_withdrawn()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_simulation_compounds() {
        let report = run(&SimulationParams::default()).unwrap();

        assert_eq!(report.epochs.len(), 12);
        assert_eq!(report.reinvest_count(), 12);
        assert!(report.total_withdrawn() > report.total_deposited());
        for outcome in &report.depositors {
            assert!(outcome.withdrawn >= outcome.deposited);
        }
        assert!(report.keeper_rewards > U256::ZERO);
        assert!(report.admin_fees > U256::ZERO);
        assert_eq!(report.admin_fees, report.dev_fees);
    }

    #[test]
    fn test_share_price_never_falls() {
        let report = run(&SimulationParams::default()).unwrap();
        for pair in report.epochs.windows(2) {
            assert!(pair[1].share_price >= pair[0].share_price);
        }
    }

    #[test]
    fn test_holders_join_one_per_epoch() {
        let report = run(&SimulationParams::default()).unwrap();
        let holders: Vec<usize> = report.epochs.iter().map(|e| e.holders).collect();
        assert_eq!(&holders[..4], &[1, 2, 3, 3]);
    }

    #[test]
    fn test_high_threshold_skips_reinvest() {
        let params = SimulationParams {
            min_tokens_to_reinvest: U256::MAX,
            ..SimulationParams::default()
        };
        let report = run(&params).unwrap();

        assert_eq!(report.reinvest_count(), 0);
        // Deposits that find pending reward still reinvest implicitly
        assert!(report.keeper_rewards.is_zero());
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, VaultEvent::Reinvest { .. })));
    }
}
