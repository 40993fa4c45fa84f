//! Vault identity and owner-controlled parameters

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use super::fees::FeeSchedule;

/// Identifiers fixed at construction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Human-readable name, also the share token name
    pub name: String,

    /// The vault's own identity on the token ledger
    pub address: Address,

    pub deposit_token: Address,

    pub reward_token: Address,

    pub staking_contract: Address,

    pub swap_pair0: Option<Address>,

    pub swap_pair1: Option<Address>,
}

/// Everything needed to deploy a vault
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultInit {
    pub config: VaultConfig,
    pub owner: Address,
    pub min_tokens_to_reinvest: U256,
    pub fees: FeeSchedule,
}

/// Mutable parameters, only changed through the admin operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultParameters {
    /// Reward below which `reinvest` is refused
    pub min_tokens_to_reinvest: U256,

    /// Pending reward above which a deposit first reinvests
    pub max_tokens_to_deposit_without_reinvest: U256,

    pub fees: FeeSchedule,

    pub deposits_enabled: bool,

    /// Dev fee recipient; also the only identity allowed to change itself
    pub dev_addr: Address,

    pub owner: Address,
}
