//! Constant-product pricing (Uniswap V2 style)

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Fee-adjusted numerator: 0.3% of every input stays in the pair
pub const FEE_NUMERATOR: u64 = 997;

pub const FEE_DENOMINATOR: u64 = 1000;

/// amountOut = amountIn * 997 * reserveOut / (reserveIn * 1000 + amountIn * 997)
///
/// Returns `None` for a zero input, an empty reserve, or overflow.
pub fn get_amount_out(amount_in: U256, reserve_in: U256, reserve_out: U256) -> Option<U256> {
    if amount_in.is_zero() || reserve_in.is_zero() || reserve_out.is_zero() {
        return None;
    }
    let amount_in_with_fee = amount_in.checked_mul(U256::from(FEE_NUMERATOR))?;
    let numerator = amount_in_with_fee.checked_mul(reserve_out)?;
    let denominator = reserve_in
        .checked_mul(U256::from(FEE_DENOMINATOR))?
        .checked_add(amount_in_with_fee)?;
    Some(numerator / denominator)
}

/// Amount of the other token matching `amount_a` at the current price.
pub fn quote(amount_a: U256, reserve_a: U256, reserve_b: U256) -> Option<U256> {
    if amount_a.is_zero() || reserve_a.is_zero() || reserve_b.is_zero() {
        return None;
    }
    amount_a.checked_mul(reserve_b).map(|n| n / reserve_a)
}

/// Integer square root, Babylonian method as in the V2 `Math.sqrt`
pub fn sqrt(y: U256) -> U256 {
    if y > U256::from(3u64) {
        let mut z = y;
        let mut x = y / U256::from(2u64) + U256::from(1u64);
        while x < z {
            z = x;
            x = (y / x + x) / U256::from(2u64);
        }
        z
    } else if !y.is_zero() {
        U256::from(1u64)
    } else {
        U256::ZERO
    }
}

/// Liquidity added by offering up to `amount0` and `amount1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityQuote {
    pub amount0: U256,
    pub amount1: U256,
    pub liquidity: U256,
}

/// Point-in-time view of a pair's tokens and reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSnapshot {
    pub pair: Address,
    pub token0: Address,
    pub token1: Address,
    pub reserve0: U256,
    pub reserve1: U256,
    /// Supply of the pair's own liquidity token
    pub total_supply: U256,
}

impl PairSnapshot {
    /// Reserves ordered as (in, out) for a swap starting from `token_in`.
    pub fn reserves_for(&self, token_in: Address) -> Option<(U256, U256)> {
        if token_in == self.token0 {
            Some((self.reserve0, self.reserve1))
        } else if token_in == self.token1 {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    /// Output of swapping `amount_in` of `token_in` through this pair.
    pub fn amount_out(&self, token_in: Address, amount_in: U256) -> Option<U256> {
        let (reserve_in, reserve_out) = self.reserves_for(token_in)?;
        get_amount_out(amount_in, reserve_in, reserve_out)
    }

    /// The same pair after a swap of `amount_in` for `amount_out` settled.
    pub fn after_swap(&self, token_in: Address, amount_in: U256, amount_out: U256) -> Option<Self> {
        let mut next = *self;
        if token_in == self.token0 {
            next.reserve0 = self.reserve0.checked_add(amount_in)?;
            next.reserve1 = self.reserve1.checked_sub(amount_out)?;
        } else if token_in == self.token1 {
            next.reserve1 = self.reserve1.checked_add(amount_in)?;
            next.reserve0 = self.reserve0.checked_sub(amount_out)?;
        } else {
            return None;
        }
        Some(next)
    }

    /// Router-style `addLiquidity`: take as much of both amounts as the
    /// current ratio allows, then mint pro rata to the supply.
    ///
    /// `None` when the pair is empty or nothing would be minted.
    pub fn liquidity_for(&self, amount0: U256, amount1: U256) -> Option<LiquidityQuote> {
        if self.total_supply.is_zero() {
            return None;
        }
        let amount1_optimal = quote(amount0, self.reserve0, self.reserve1)?;
        let (amount0, amount1) = if amount1_optimal <= amount1 {
            (amount0, amount1_optimal)
        } else {
            (quote(amount1, self.reserve1, self.reserve0)?, amount1)
        };

        let liquidity0 = amount0.checked_mul(self.total_supply)? / self.reserve0;
        let liquidity1 = amount1.checked_mul(self.total_supply)? / self.reserve1;
        let liquidity = liquidity0.min(liquidity1);
        if liquidity.is_zero() {
            return None;
        }
        Some(LiquidityQuote {
            amount0,
            amount1,
            liquidity,
        })
    }
}
