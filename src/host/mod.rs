//! Collaborator interfaces
//!
//! The vault never owns token balances, staking positions or pair reserves
//! itself. It drives them through these traits:
//! - `TokenLedger` for balances, transfers and allowances
//! - `StakingPool` for the rewards-staking contract
//! - `PairReader` / `SwapPair` for constant-product trading pairs
//!
//! A `Host` bundles all three. It must be `Clone` so that a failed vault
//! operation can restore the exact pre-call state.

mod memory;

pub use memory::MemoryHost;

use alloy_primitives::{Address, U256};
use thiserror::Error;

/// Failures reported by a collaborator. The vault surfaces these unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("insufficient balance of {token} for {holder}: needed {needed}, available {available}")]
    InsufficientBalance {
        token: Address,
        holder: Address,
        needed: U256,
        available: U256,
    },

    #[error("insufficient allowance of {token} from {owner} to {spender}: needed {needed}, available {available}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        needed: U256,
        available: U256,
    },

    #[error("cannot withdraw {requested} from pool {pool}: {staker} has {staked} staked")]
    InsufficientStake {
        pool: Address,
        staker: Address,
        requested: U256,
        staked: U256,
    },

    #[error("unknown staking pool {0}")]
    UnknownPool(Address),

    #[error("unknown pair {0}")]
    UnknownPair(Address),

    #[error("pair {0}: insufficient input amount")]
    InsufficientInputAmount(Address),

    #[error("pair {0}: insufficient output amount")]
    InsufficientOutputAmount(Address),

    #[error("pair {0}: insufficient liquidity")]
    InsufficientLiquidity(Address),

    #[error("pair {0}: insufficient liquidity minted")]
    InsufficientLiquidityMinted(Address),

    #[error("pair {0}: constant product violated")]
    ConstantProductViolated(Address),

    #[error("arithmetic overflow in collaborator")]
    Overflow,
}

/// Balance, transfer and allowance ledger for every token the vault touches.
pub trait TokenLedger {
    fn balance_of(&self, token: Address, holder: Address) -> U256;

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256;

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError>;

    /// Move `amount` from `from` to `to` on behalf of `spender`, consuming allowance.
    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError>;
}

/// External rewards-staking contract (StakingRewards-style).
pub trait StakingPool {
    fn staking_token(&self, pool: Address) -> Result<Address, HostError>;

    fn rewards_token(&self, pool: Address) -> Result<Address, HostError>;

    /// Pull `amount` of the staking token from `staker` (needs allowance to `pool`).
    fn stake(&mut self, pool: Address, staker: Address, amount: U256) -> Result<(), HostError>;

    fn withdraw(&mut self, pool: Address, staker: Address, amount: U256) -> Result<(), HostError>;

    /// Pay out everything `staker` has earned; returns the amount paid.
    fn get_reward(&mut self, pool: Address, staker: Address) -> Result<U256, HostError>;

    fn earned(&self, pool: Address, staker: Address) -> U256;

    fn staked_balance(&self, pool: Address, staker: Address) -> U256;
}

/// Read-only view of a constant-product pair.
pub trait PairReader {
    fn pair_tokens(&self, pair: Address) -> Result<(Address, Address), HostError>;

    fn pair_reserves(&self, pair: Address) -> Result<(U256, U256), HostError>;

    /// Supply of the pair's liquidity token.
    fn pair_total_supply(&self, pair: Address) -> Result<U256, HostError>;
}

/// Uniswap V2 style pair: input is sent to the pair before `swap` is called.
pub trait SwapPair: PairReader {
    fn swap(
        &mut self,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    ) -> Result<(), HostError>;

    /// Mint liquidity for whatever was sent to the pair since the last
    /// sync; returns the liquidity credited to `to`.
    fn mint_liquidity(&mut self, pair: Address, to: Address) -> Result<U256, HostError>;
}

/// Everything a vault needs from the environment it runs in.
pub trait Host: TokenLedger + StakingPool + SwapPair + Clone {}

impl<T> Host for T where T: TokenLedger + StakingPool + SwapPair + Clone {}
