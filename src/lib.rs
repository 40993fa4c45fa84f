//! Autocompounder - Auto-Compounding Yield Vault Engine
//!
//! Depositors lock a deposit token and receive vault shares. The vault
//! stakes the deposits, harvests the reward token, converts it back through
//! one or two constant-product pairs and restakes the proceeds, so each
//! share redeems for more deposit token over time.
//!
//! - `vault`: share accounting, fees, reinvest cycle, admin controls
//! - `router`: reward-to-deposit conversion over V2 pairs
//! - `host`: collaborator traits and the in-memory host
//! - `chain`: read-only RPC access for quoting and monitoring
//! - `simulator`: offline scenario runner

pub mod chain;
pub mod config;
pub mod host;
pub mod router;
pub mod simulator;
pub mod vault;

pub use config::Config;
pub use host::{Host, HostError, MemoryHost};
pub use router::SwapRouter;
pub use vault::{FeeSchedule, Vault, VaultError, VaultEvent};
