//! Runtime configuration for the vault tooling
//!
//! Describes one vault (tokens, staking contract, swap route, fees) plus the
//! RPC endpoint and event log settings used by the binaries. Loaded from
//! environment variables and `.env`, or from a TOML file.

use alloy_primitives::{Address, U256};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::vault::{FeeSchedule, VaultConfig, VaultInit};

// Avalanche C-Chain
const WAVAX: &str = "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7";
const PNG: &str = "0x60781C2586D68229fde47564546784ab3fACA982";
const PNG_WAVAX_PAIR: &str = "0xd7538cABBf8605BdE1f4901B47B8D42c61DE0367";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // ========== Network Settings ==========
    pub rpc_url: String,

    // ========== Vault Identity ==========
    /// Share token name
    pub vault_name: String,

    /// Deployed vault to monitor, if any
    pub vault_address: Option<String>,

    pub owner: String,

    /// Dev fee recipient at deployment
    pub deployer: String,

    pub deposit_token: String,

    pub reward_token: String,

    pub staking_contract: String,

    /// First hop out of the reward token, or for an LP deposit token the
    /// pair buying one of its sides
    pub swap_pair0: Option<String>,

    pub swap_pair1: Option<String>,

    // ========== Reinvest Settings ==========
    /// Minimum pending reward (wei) before reinvest is accepted
    pub min_tokens_to_reinvest: String,

    pub admin_fee_bips: u64,

    pub dev_fee_bips: u64,

    pub reinvest_reward_bips: u64,

    // ========== Monitoring ==========
    pub monitor_interval_secs: u64,

    /// Write committed vault events to `event_log_path`
    pub event_log: bool,

    pub event_log_path: String,
}

impl Config {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            rpc_url: env::var("RPC_URL").unwrap_or(defaults.rpc_url),

            vault_name: env::var("VAULT_NAME").unwrap_or(defaults.vault_name),
            vault_address: env::var("VAULT_ADDRESS").ok(),
            owner: env::var("VAULT_OWNER").unwrap_or(defaults.owner),
            deployer: env::var("VAULT_DEPLOYER").unwrap_or(defaults.deployer),
            deposit_token: env::var("DEPOSIT_TOKEN").unwrap_or(defaults.deposit_token),
            reward_token: env::var("REWARD_TOKEN").unwrap_or(defaults.reward_token),
            staking_contract: env::var("STAKING_CONTRACT").unwrap_or(defaults.staking_contract),
            swap_pair0: env::var("SWAP_PAIR0").ok().or(defaults.swap_pair0),
            swap_pair1: env::var("SWAP_PAIR1").ok().or(defaults.swap_pair1),

            min_tokens_to_reinvest: env::var("MIN_TOKENS_TO_REINVEST")
                .unwrap_or(defaults.min_tokens_to_reinvest),
            admin_fee_bips: env::var("ADMIN_FEE_BIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.admin_fee_bips),
            dev_fee_bips: env::var("DEV_FEE_BIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.dev_fee_bips),
            reinvest_reward_bips: env::var("REINVEST_REWARD_BIPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.reinvest_reward_bips),

            monitor_interval_secs: env::var("MONITOR_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.monitor_interval_secs),
            event_log: env::var("EVENT_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.event_log),
            event_log_path: env::var("EVENT_LOG_PATH").unwrap_or(defaults.event_log_path),
        })
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a valid endpoint"));
        }

        let config = self.vault_config(Address::ZERO)?;
        if config.staking_contract.is_zero() {
            return Err(eyre!("STAKING_CONTRACT must be set"));
        }
        // Whether the pairs form a route depends on live pair tokens,
        // checked when the router resolves
        if config.swap_pair0.is_some() && config.swap_pair0 == config.swap_pair1 {
            return Err(eyre!("SWAP_PAIR0 and SWAP_PAIR1 must differ"));
        }
        if self.owner_address()?.is_zero() {
            return Err(eyre!("VAULT_OWNER must not be the zero address"));
        }
        self.deployer_address()?;
        self.vault_address()?;

        self.fee_schedule().map_err(|e| eyre!("Invalid fees: {}", e))?;
        self.min_tokens_to_reinvest()?;
        Ok(())
    }

    /// Vault identity with the given on-ledger address
    pub fn vault_config(&self, address: Address) -> Result<VaultConfig> {
        Ok(VaultConfig {
            name: self.vault_name.clone(),
            address,
            deposit_token: parse_address("DEPOSIT_TOKEN", &self.deposit_token)?,
            reward_token: parse_address("REWARD_TOKEN", &self.reward_token)?,
            staking_contract: parse_address("STAKING_CONTRACT", &self.staking_contract)?,
            swap_pair0: self
                .swap_pair0
                .as_deref()
                .map(|s| parse_address("SWAP_PAIR0", s))
                .transpose()?,
            swap_pair1: self
                .swap_pair1
                .as_deref()
                .map(|s| parse_address("SWAP_PAIR1", s))
                .transpose()?,
        })
    }

    pub fn vault_init(&self, address: Address) -> Result<VaultInit> {
        Ok(VaultInit {
            config: self.vault_config(address)?,
            owner: self.owner_address()?,
            min_tokens_to_reinvest: self.min_tokens_to_reinvest()?,
            fees: self.fee_schedule()?,
        })
    }

    pub fn owner_address(&self) -> Result<Address> {
        parse_address("VAULT_OWNER", &self.owner)
    }

    pub fn deployer_address(&self) -> Result<Address> {
        parse_address("VAULT_DEPLOYER", &self.deployer)
    }

    pub fn vault_address(&self) -> Result<Option<Address>> {
        self.vault_address
            .as_deref()
            .map(|s| parse_address("VAULT_ADDRESS", s))
            .transpose()
    }

    pub fn fee_schedule(&self) -> Result<FeeSchedule> {
        Ok(FeeSchedule::new(
            self.admin_fee_bips,
            self.dev_fee_bips,
            self.reinvest_reward_bips,
        )?)
    }

    pub fn min_tokens_to_reinvest(&self) -> Result<U256> {
        U256::from_str(&self.min_tokens_to_reinvest)
            .wrap_err_with(|| format!("Invalid MIN_TOKENS_TO_REINVEST: {}", self.min_tokens_to_reinvest))
    }

    pub fn print_summary(&self) {
        let hops = match (&self.swap_pair0, &self.swap_pair1) {
            (None, None) => "no swap pairs",
            (Some(_), Some(_)) => "2 swap pairs",
            _ => "1 swap pair",
        };

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              AUTOCOMPOUNDER - CONFIGURATION                ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Vault:             {:^40} ║", self.vault_name);
        println!("║ Route:             {:^40} ║", hops);
        println!("║ Monitoring:        {:^40} ║",
            if self.vault_address.is_some() { "✓ Vault address set" } else { "✗ No vault address" }
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ FEES (bips)                                                ║");
        println!("║ • Admin:           {:<40} ║", self.admin_fee_bips);
        println!("║ • Dev:             {:<40} ║", self.dev_fee_bips);
        println!("║ • Reinvest Reward: {:<40} ║", self.reinvest_reward_bips);
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ REINVEST                                                   ║");
        println!("║ • Min Reward:      {:<40} ║", self.min_tokens_to_reinvest);
        println!("║ • Poll Interval:   {:<38} s ║", self.monitor_interval_secs);
        println!("║ • Event Log:       {:^40} ║",
            if self.event_log { "✓ Enabled" } else { "✗ Disabled" }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.avax.network/ext/bc/C/rpc".to_string(),
            vault_name: "Autocompounder: PNG-WAVAX".to_string(),
            vault_address: None,
            owner: "0x0000000000000000000000000000000000000001".to_string(),
            deployer: "0x0000000000000000000000000000000000000002".to_string(),
            deposit_token: WAVAX.to_string(),
            reward_token: PNG.to_string(),
            staking_contract: format!("{:?}", Address::ZERO),
            swap_pair0: Some(PNG_WAVAX_PAIR.to_string()),
            swap_pair1: None,
            min_tokens_to_reinvest: "1000000000000000000".to_string(),
            admin_fee_bips: 100,
            dev_fee_bips: 100,
            reinvest_reward_bips: 500,
            monitor_interval_secs: 60,
            event_log: true,
            event_log_path: "./logs/vault_events.jsonl".to_string(),
        }
    }
}

fn parse_address(name: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).wrap_err_with(|| format!("Invalid {}: {}", name, value))
}

// ============================================
// TESTS
// ============================================
