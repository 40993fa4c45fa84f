//! Events recorded by committed vault operations

use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum VaultEvent {
    Deposit { account: Address, amount: U256 },
    Withdraw { account: Address, amount: U256 },
    Reinvest { total_deposits: U256, total_supply: U256 },
    Recovered { token: Address, amount: U256 },
    UpdateAdminFee { old: u64, new: u64 },
    UpdateDevFee { old: u64, new: u64 },
    UpdateReinvestReward { old: u64, new: u64 },
    UpdateMinTokensToReinvest { old: U256, new: U256 },
    UpdateMaxTokensToDepositWithoutReinvest { old: U256, new: U256 },
    UpdateDevAddr { old: Address, new: Address },
    DepositsEnabled { enabled: bool },
    OwnershipTransferred { previous: Address, new: Address },

    /// Share token movement; mint has `from` zero, burn has `to` zero
    Transfer { from: Address, to: Address, value: U256 },
    Approval { owner: Address, spender: Address, value: U256 },
}

/// A timestamped event as written to the event log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub vault: String,
    #[serde(flatten)]
    pub event: VaultEvent,
}

impl EventRecord {
    pub fn new(vault: &str, event: VaultEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            vault: vault.to_string(),
            event,
        }
    }

    /// Append this record to a JSON-lines file
    pub fn append_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        let json = serde_json::to_string(self)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }
}
