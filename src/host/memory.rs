//! In-memory host
//!
//! Plain-map implementation of every collaborator trait. Used by the tests and
//! by the `simulate` command to run the vault end-to-end without a chain.
//!
//! Rewards are not time-based: `distribute_rewards` credits a lump sum pro rata
//! to whoever is staked at that moment.
//!
//! A pair's liquidity token uses the pair's own address as its token address.

use alloy_primitives::{Address, U256};
use std::collections::HashMap;
use tracing::{debug, trace};

use super::{HostError, PairReader, StakingPool, SwapPair, TokenLedger};
use crate::router::amm::{sqrt, FEE_DENOMINATOR, FEE_NUMERATOR};

#[derive(Debug, Clone)]
struct RewardPool {
    staking_token: Address,
    rewards_token: Address,
    total_staked: U256,
    stakes: HashMap<Address, U256>,
    rewards: HashMap<Address, U256>,
}

#[derive(Debug, Clone)]
struct PairState {
    token0: Address,
    token1: Address,
    reserve0: U256,
    reserve1: U256,
    total_supply: U256,
}

/// Token balances, staking pools and pairs held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    /// (token, holder) -> balance
    balances: HashMap<(Address, Address), U256>,

    /// (token, owner, spender) -> allowance
    allowances: HashMap<(Address, Address, Address), U256>,

    pools: HashMap<Address, RewardPool>,

    pairs: HashMap<Address, PairState>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` of `token` to `to` out of thin air (harness funding only).
    ///
    /// Minting a pair's liquidity token grows that pair's supply.
    pub fn mint(&mut self, token: Address, to: Address, amount: U256) {
        let balance = self.balances.entry((token, to)).or_default();
        *balance = balance.saturating_add(amount);
        if let Some(state) = self.pairs.get_mut(&token) {
            state.total_supply = state.total_supply.saturating_add(amount);
        }
    }

    /// Register a rewards pool at `pool` staking `staking_token` and paying `rewards_token`.
    pub fn add_pool(&mut self, pool: Address, staking_token: Address, rewards_token: Address) {
        self.pools.insert(
            pool,
            RewardPool {
                staking_token,
                rewards_token,
                total_staked: U256::ZERO,
                stakes: HashMap::new(),
                rewards: HashMap::new(),
            },
        );
    }

    /// Register a pair and seed its reserves.
    ///
    /// The seed liquidity, `sqrt(reserve0 * reserve1)`, is held by the zero
    /// address.
    pub fn add_pair(
        &mut self,
        pair: Address,
        token0: Address,
        token1: Address,
        reserve0: U256,
        reserve1: U256,
    ) {
        self.mint(token0, pair, reserve0);
        self.mint(token1, pair, reserve1);
        self.pairs.insert(
            pair,
            PairState {
                token0,
                token1,
                reserve0,
                reserve1,
                total_supply: U256::ZERO,
            },
        );
        self.mint(pair, Address::ZERO, sqrt(reserve0.saturating_mul(reserve1)));
    }

    /// Credit `amount` of reward token to the pool's stakers pro rata.
    ///
    /// Returns the amount actually credited (rounding dust is never credited).
    pub fn distribute_rewards(&mut self, pool: Address, amount: U256) -> Result<U256, HostError> {
        let (rewards_token, credited) = {
            let state = self.pools.get_mut(&pool).ok_or(HostError::UnknownPool(pool))?;
            if state.total_staked.is_zero() {
                return Ok(U256::ZERO);
            }

            let mut credited = U256::ZERO;
            for (staker, stake) in &state.stakes {
                let share = amount
                    .checked_mul(*stake)
                    .ok_or(HostError::Overflow)?
                    / state.total_staked;
                if share.is_zero() {
                    continue;
                }
                let owed = state.rewards.entry(*staker).or_default();
                *owed = owed.checked_add(share).ok_or(HostError::Overflow)?;
                credited += share;
            }
            (state.rewards_token, credited)
        };

        self.mint(rewards_token, pool, credited);
        debug!("Distributed {} reward to pool {:?}", credited, pool);
        Ok(credited)
    }

    fn pool(&self, pool: Address) -> Result<&RewardPool, HostError> {
        self.pools.get(&pool).ok_or(HostError::UnknownPool(pool))
    }

    fn pool_mut(&mut self, pool: Address) -> Result<&mut RewardPool, HostError> {
        self.pools.get_mut(&pool).ok_or(HostError::UnknownPool(pool))
    }
}

impl TokenLedger for MemoryHost {
    fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances.get(&(token, holder)).copied().unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn approve(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        self.allowances.insert((token, owner, spender), amount);
        Ok(())
    }

    fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(HostError::InsufficientBalance {
                token,
                holder: from,
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(token, to)
            .checked_add(amount)
            .ok_or(HostError::Overflow)?;
        self.balances.insert((token, from), available - amount);
        self.balances.insert((token, to), credited);
        trace!("transfer {} of {:?}: {:?} -> {:?}", amount, token, from, to);
        Ok(())
    }

    fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), HostError> {
        let allowed = self.allowance(token, from, spender);
        if allowed < amount {
            return Err(HostError::InsufficientAllowance {
                token,
                owner: from,
                spender,
                needed: amount,
                available: allowed,
            });
        }

        self.transfer(token, from, to, amount)?;

        // Unlimited approvals are never decremented
        if allowed != U256::MAX {
            self.allowances.insert((token, from, spender), allowed - amount);
        }
        Ok(())
    }
}

impl StakingPool for MemoryHost {
    fn staking_token(&self, pool: Address) -> Result<Address, HostError> {
        Ok(self.pool(pool)?.staking_token)
    }

    fn rewards_token(&self, pool: Address) -> Result<Address, HostError> {
        Ok(self.pool(pool)?.rewards_token)
    }

    fn stake(&mut self, pool: Address, staker: Address, amount: U256) -> Result<(), HostError> {
        let staking_token = self.pool(pool)?.staking_token;
        self.transfer_from(staking_token, pool, staker, pool, amount)?;

        let state = self.pool_mut(pool)?;
        let stake = state.stakes.entry(staker).or_default();
        *stake = stake.checked_add(amount).ok_or(HostError::Overflow)?;
        state.total_staked = state.total_staked.checked_add(amount).ok_or(HostError::Overflow)?;
        Ok(())
    }

    fn withdraw(&mut self, pool: Address, staker: Address, amount: U256) -> Result<(), HostError> {
        let state = self.pool_mut(pool)?;
        let staked = state.stakes.get(&staker).copied().unwrap_or_default();
        if staked < amount {
            return Err(HostError::InsufficientStake {
                pool,
                staker,
                requested: amount,
                staked,
            });
        }
        state.stakes.insert(staker, staked - amount);
        state.total_staked -= amount;
        let staking_token = state.staking_token;

        self.transfer(staking_token, pool, staker, amount)
    }

    fn get_reward(&mut self, pool: Address, staker: Address) -> Result<U256, HostError> {
        let state = self.pool_mut(pool)?;
        let reward = state.rewards.remove(&staker).unwrap_or_default();
        let rewards_token = state.rewards_token;

        if !reward.is_zero() {
            self.transfer(rewards_token, pool, staker, reward)?;
        }
        Ok(reward)
    }

    fn earned(&self, pool: Address, staker: Address) -> U256 {
        self.pools
            .get(&pool)
            .and_then(|p| p.rewards.get(&staker).copied())
            .unwrap_or_default()
    }

    fn staked_balance(&self, pool: Address, staker: Address) -> U256 {
        self.pools
            .get(&pool)
            .and_then(|p| p.stakes.get(&staker).copied())
            .unwrap_or_default()
    }
}

impl PairReader for MemoryHost {
    fn pair_tokens(&self, pair: Address) -> Result<(Address, Address), HostError> {
        let state = self.pairs.get(&pair).ok_or(HostError::UnknownPair(pair))?;
        Ok((state.token0, state.token1))
    }

    fn pair_reserves(&self, pair: Address) -> Result<(U256, U256), HostError> {
        let state = self.pairs.get(&pair).ok_or(HostError::UnknownPair(pair))?;
        Ok((state.reserve0, state.reserve1))
    }

    fn pair_total_supply(&self, pair: Address) -> Result<U256, HostError> {
        let state = self.pairs.get(&pair).ok_or(HostError::UnknownPair(pair))?;
        Ok(state.total_supply)
    }
}

impl SwapPair for MemoryHost {
    fn swap(
        &mut self,
        pair: Address,
        amount0_out: U256,
        amount1_out: U256,
        to: Address,
    ) -> Result<(), HostError> {
        if amount0_out.is_zero() && amount1_out.is_zero() {
            return Err(HostError::InsufficientOutputAmount(pair));
        }
        let PairState {
            token0,
            token1,
            reserve0,
            reserve1,
            ..
        } = self.pairs.get(&pair).cloned().ok_or(HostError::UnknownPair(pair))?;
        if amount0_out >= reserve0 || amount1_out >= reserve1 {
            return Err(HostError::InsufficientLiquidity(pair));
        }

        if !amount0_out.is_zero() {
            self.transfer(token0, pair, to, amount0_out)?;
        }
        if !amount1_out.is_zero() {
            self.transfer(token1, pair, to, amount1_out)?;
        }

        let balance0 = self.balance_of(token0, pair);
        let balance1 = self.balance_of(token1, pair);
        let amount0_in = balance0.saturating_sub(reserve0 - amount0_out);
        let amount1_in = balance1.saturating_sub(reserve1 - amount1_out);
        if amount0_in.is_zero() && amount1_in.is_zero() {
            return Err(HostError::InsufficientInputAmount(pair));
        }

        // balance * 1000 - amount_in * 3 on both sides must keep K
        let denominator = U256::from(FEE_DENOMINATOR);
        let fee = U256::from(FEE_DENOMINATOR - FEE_NUMERATOR);
        let adjusted = |balance: U256, amount_in: U256| -> Result<U256, HostError> {
            balance
                .checked_mul(denominator)
                .and_then(|b| b.checked_sub(amount_in.checked_mul(fee)?))
                .ok_or(HostError::Overflow)
        };
        let k_after = adjusted(balance0, amount0_in)?
            .checked_mul(adjusted(balance1, amount1_in)?)
            .ok_or(HostError::Overflow)?;
        let k_before = reserve0
            .checked_mul(reserve1)
            .and_then(|k| k.checked_mul(denominator * denominator))
            .ok_or(HostError::Overflow)?;
        if k_after < k_before {
            return Err(HostError::ConstantProductViolated(pair));
        }

        if let Some(state) = self.pairs.get_mut(&pair) {
            state.reserve0 = balance0;
            state.reserve1 = balance1;
        }
        trace!(
            "swap on {:?}: in ({}, {}) out ({}, {})",
            pair, amount0_in, amount1_in, amount0_out, amount1_out
        );
        Ok(())
    }

    fn mint_liquidity(&mut self, pair: Address, to: Address) -> Result<U256, HostError> {
        let PairState {
            token0,
            token1,
            reserve0,
            reserve1,
            total_supply,
        } = self.pairs.get(&pair).cloned().ok_or(HostError::UnknownPair(pair))?;
        // Seeding an empty pair is not supported here
        if total_supply.is_zero() || reserve0.is_zero() || reserve1.is_zero() {
            return Err(HostError::InsufficientLiquidity(pair));
        }

        let balance0 = self.balance_of(token0, pair);
        let balance1 = self.balance_of(token1, pair);
        let amount0 = balance0.saturating_sub(reserve0);
        let amount1 = balance1.saturating_sub(reserve1);

        let liquidity0 = amount0.checked_mul(total_supply).ok_or(HostError::Overflow)? / reserve0;
        let liquidity1 = amount1.checked_mul(total_supply).ok_or(HostError::Overflow)? / reserve1;
        let liquidity = liquidity0.min(liquidity1);
        if liquidity.is_zero() {
            return Err(HostError::InsufficientLiquidityMinted(pair));
        }

        self.mint(pair, to, liquidity);
        if let Some(state) = self.pairs.get_mut(&pair) {
            state.reserve0 = balance0;
            state.reserve1 = balance1;
        }
        debug!(
            "mint on {:?}: in ({}, {}) -> {} liquidity to {:?}",
            pair, amount0, amount1, liquidity, to
        );
        Ok(liquidity)
    }
}
