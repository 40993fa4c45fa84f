//! Reward-to-deposit-token conversion
//!
//! The route is fixed at construction and takes one of two shapes:
//! - a chain of zero, one or two constant-product pairs from the reward
//!   token to the deposit token
//! - when the deposit token is itself a pair, one leg per side of that
//!   pair: half of the reward is converted down each leg (or kept, when the
//!   reward token already is that side) and the two halves are added as
//!   liquidity
//!
//! Each swap follows the V2 pattern of sending input to the pair, then
//! calling `swap`. Liquidity is added the same way: both sides are sent,
//! then `mint` is called.

pub mod amm;

use alloy_primitives::{Address, U256};
use tracing::debug;

use crate::host::{HostError, PairReader, SwapPair, TokenLedger};
use crate::vault::VaultError;
use amm::PairSnapshot;

/// One swap of the conversion route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hop {
    pub pair: Address,
    pub token_in: Address,
    pub token_out: Address,
}

/// Shape of the conversion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Swap hop by hop; empty when reward and deposit token coincide
    Chain(Vec<Hop>),
    /// Deposit token is `pair`; `leg0`/`leg1` buy its `token0`/`token1`
    Liquidity {
        pair: Address,
        token0: Address,
        token1: Address,
        leg0: Option<Hop>,
        leg1: Option<Hop>,
    },
}

/// Converts reward token into deposit token through the configured pairs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRouter {
    reward_token: Address,
    deposit_token: Address,
    route: Route,
}

impl SwapRouter {
    /// Resolve the route against the pairs' actual tokens.
    ///
    /// A deposit token the reader knows as a pair gets a liquidity route,
    /// with each configured pair assigned to the side it buys. Any other
    /// deposit token gets a hop chain through `swap_pair0` then `swap_pair1`.
    pub fn resolve<R: PairReader + ?Sized>(
        reader: &R,
        reward_token: Address,
        deposit_token: Address,
        swap_pair0: Option<Address>,
        swap_pair1: Option<Address>,
    ) -> Result<Self, VaultError> {
        let route = match reader.pair_tokens(deposit_token) {
            Ok((token0, token1)) if reward_token != deposit_token => resolve_liquidity(
                reader,
                reward_token,
                deposit_token,
                (token0, token1),
                swap_pair0,
                swap_pair1,
            )?,
            _ => resolve_chain(reader, reward_token, deposit_token, swap_pair0, swap_pair1)?,
        };

        let router = Self {
            reward_token,
            deposit_token,
            route,
        };
        debug!(
            "Resolved route {:?} -> {:?}: {} swaps{}",
            reward_token,
            deposit_token,
            router.hops().len(),
            if router.liquidity_pair().is_some() { " then add liquidity" } else { "" }
        );
        Ok(router)
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Every swap the conversion performs, in execution order
    pub fn hops(&self) -> Vec<Hop> {
        match &self.route {
            Route::Chain(hops) => hops.clone(),
            Route::Liquidity { leg0, leg1, .. } => leg0.iter().chain(leg1.iter()).copied().collect(),
        }
    }

    /// The pair liquidity is added to, for an LP deposit token
    pub fn liquidity_pair(&self) -> Option<Address> {
        match self.route {
            Route::Chain(_) => None,
            Route::Liquidity { pair, .. } => Some(pair),
        }
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn deposit_token(&self) -> Address {
        self.deposit_token
    }

    /// Deposit tokens `amount_in` of reward token would buy right now.
    ///
    /// Zero when any swap or the liquidity mint would produce nothing.
    pub fn quote<R: PairReader + ?Sized>(
        &self,
        reader: &R,
        amount_in: U256,
    ) -> Result<U256, VaultError> {
        match &self.route {
            Route::Chain(hops) => {
                let mut amount = amount_in;
                for hop in hops {
                    let snapshot = snapshot(reader, hop.pair)?;
                    match snapshot.amount_out(hop.token_in, amount) {
                        Some(out) => amount = out,
                        None => return Ok(U256::ZERO),
                    }
                }
                Ok(amount)
            }
            Route::Liquidity {
                pair, leg0, leg1, ..
            } => {
                let half = amount_in / U256::from(2u64);
                if half.is_zero() {
                    return Ok(U256::ZERO);
                }
                // A leg may swap through the deposit pair itself, which moves
                // the price liquidity is added at
                let mut target = snapshot(reader, *pair)?;
                let mut amounts = [half, half];
                for (slot, leg) in [leg0, leg1].into_iter().enumerate() {
                    let Some(hop) = leg else { continue };
                    let through = if hop.pair == target.pair {
                        target
                    } else {
                        snapshot(reader, hop.pair)?
                    };
                    let Some(out) = through.amount_out(hop.token_in, half) else {
                        return Ok(U256::ZERO);
                    };
                    if hop.pair == target.pair {
                        match target.after_swap(hop.token_in, half, out) {
                            Some(next) => target = next,
                            None => return Ok(U256::ZERO),
                        }
                    }
                    amounts[slot] = out;
                }
                Ok(target
                    .liquidity_for(amounts[0], amounts[1])
                    .map(|q| q.liquidity)
                    .unwrap_or_default())
            }
        }
    }

    /// Convert `amount_in` reward tokens held by `vault` into deposit tokens.
    ///
    /// If the full route would yield nothing, no swap is executed and the
    /// input stays with the vault. Liquidity leftovers from an uneven pair
    /// of halves also stay with the vault.
    pub fn convert<H: TokenLedger + SwapPair>(
        &self,
        host: &mut H,
        vault: Address,
        amount_in: U256,
    ) -> Result<U256, VaultError> {
        if amount_in.is_zero() {
            return Ok(U256::ZERO);
        }
        if let Route::Chain(hops) = &self.route {
            if hops.is_empty() {
                return Ok(amount_in);
            }
        }
        if self.quote(&*host, amount_in)?.is_zero() {
            debug!("Conversion of {} reward yields nothing, skipping swaps", amount_in);
            return Ok(U256::ZERO);
        }

        match &self.route {
            Route::Chain(hops) => {
                let mut amount = amount_in;
                for hop in hops {
                    amount = swap(host, vault, hop, amount)?;
                }
                Ok(amount)
            }
            Route::Liquidity {
                pair,
                token0,
                token1,
                leg0,
                leg1,
            } => {
                let half = amount_in / U256::from(2u64);
                let amount0 = match leg0 {
                    Some(hop) => swap(host, vault, hop, half)?,
                    None => half,
                };
                let amount1 = match leg1 {
                    Some(hop) => swap(host, vault, hop, half)?,
                    None => half,
                };

                let quote = snapshot(&*host, *pair)?
                    .liquidity_for(amount0, amount1)
                    .ok_or(HostError::InsufficientLiquidityMinted(*pair))?;
                host.transfer(*token0, vault, *pair, quote.amount0)?;
                host.transfer(*token1, vault, *pair, quote.amount1)?;
                let minted = host.mint_liquidity(*pair, vault)?;

                debug!(
                    "Added {} {:?} + {} {:?} to {:?} for {} liquidity",
                    quote.amount0, token0, quote.amount1, token1, pair, minted
                );
                Ok(minted)
            }
        }
    }
}

fn resolve_chain<R: PairReader + ?Sized>(
    reader: &R,
    reward_token: Address,
    deposit_token: Address,
    swap_pair0: Option<Address>,
    swap_pair1: Option<Address>,
) -> Result<Route, VaultError> {
    let pairs: Vec<Address> = match (swap_pair0, swap_pair1) {
        (None, Some(pair)) => {
            return Err(VaultError::InvalidRoute(format!(
                "swap pair 1 ({pair}) configured without swap pair 0"
            )))
        }
        (first, second) => first.into_iter().chain(second).collect(),
    };

    let mut hops = Vec::with_capacity(pairs.len());
    let mut current = reward_token;
    for pair in pairs {
        let (token0, token1) = reader.pair_tokens(pair)?;
        let token_out = if current == token0 {
            token1
        } else if current == token1 {
            token0
        } else {
            return Err(VaultError::InvalidRoute(format!(
                "pair {pair} does not trade {current}"
            )));
        };
        hops.push(Hop {
            pair,
            token_in: current,
            token_out,
        });
        current = token_out;
    }

    if current != deposit_token {
        return Err(VaultError::InvalidRoute(format!(
            "route ends at {current}, expected deposit token {deposit_token}"
        )));
    }
    Ok(Route::Chain(hops))
}

fn resolve_liquidity<R: PairReader + ?Sized>(
    reader: &R,
    reward_token: Address,
    pair: Address,
    (token0, token1): (Address, Address),
    swap_pair0: Option<Address>,
    swap_pair1: Option<Address>,
) -> Result<Route, VaultError> {
    if let (Some(first), Some(second)) = (swap_pair0, swap_pair1) {
        if first == second {
            return Err(VaultError::InvalidRoute(format!(
                "swap pair {first} configured twice"
            )));
        }
    }
    let mut unused: Vec<Address> = swap_pair0.into_iter().chain(swap_pair1).collect();

    let leg0 = liquidity_leg(reader, reward_token, token0, pair, [swap_pair0, swap_pair1], &mut unused)?;
    let leg1 = liquidity_leg(reader, reward_token, token1, pair, [swap_pair1, swap_pair0], &mut unused)?;
    if let Some(extra) = unused.first() {
        return Err(VaultError::InvalidRoute(format!(
            "pair {extra} is not used by the route into {pair}"
        )));
    }

    Ok(Route::Liquidity {
        pair,
        token0,
        token1,
        leg0,
        leg1,
    })
}

/// The swap buying `target` with reward token. `None` when the reward token
/// is `target`; otherwise the first unused candidate trading the two, and
/// failing that the deposit pair itself.
fn liquidity_leg<R: PairReader + ?Sized>(
    reader: &R,
    reward_token: Address,
    target: Address,
    deposit_pair: Address,
    candidates: [Option<Address>; 2],
    unused: &mut Vec<Address>,
) -> Result<Option<Hop>, VaultError> {
    if reward_token == target {
        return Ok(None);
    }

    let mut through = None;
    for pair in candidates.into_iter().flatten() {
        if unused.contains(&pair) && trades(reader, pair, reward_token, target)? {
            unused.retain(|p| *p != pair);
            through = Some(pair);
            break;
        }
    }
    let pair = match through {
        Some(pair) => pair,
        None if trades(reader, deposit_pair, reward_token, target)? => deposit_pair,
        None => {
            return Err(VaultError::InvalidRoute(format!(
                "no pair converts {reward_token} into {target} for {deposit_pair}"
            )))
        }
    };

    Ok(Some(Hop {
        pair,
        token_in: reward_token,
        token_out: target,
    }))
}

fn trades<R: PairReader + ?Sized>(reader: &R, pair: Address, a: Address, b: Address) -> Result<bool, HostError> {
    let (token0, token1) = reader.pair_tokens(pair)?;
    Ok((token0 == a && token1 == b) || (token0 == b && token1 == a))
}

/// Send `amount` of `hop.token_in` to the pair and swap it out to `vault`.
fn swap<H: TokenLedger + SwapPair>(host: &mut H, vault: Address, hop: &Hop, amount: U256) -> Result<U256, VaultError> {
    let snapshot = snapshot(&*host, hop.pair)?;
    let amount_out = snapshot
        .amount_out(hop.token_in, amount)
        .ok_or(HostError::InsufficientLiquidity(hop.pair))?;

    host.transfer(hop.token_in, vault, hop.pair, amount)?;
    let (amount0_out, amount1_out) = if hop.token_in == snapshot.token0 {
        (U256::ZERO, amount_out)
    } else {
        (amount_out, U256::ZERO)
    };
    host.swap(hop.pair, amount0_out, amount1_out, vault)?;

    debug!(
        "Swapped {} {:?} -> {} {:?} via {:?}",
        amount, hop.token_in, amount_out, hop.token_out, hop.pair
    );
    Ok(amount_out)
}

fn snapshot<R: PairReader + ?Sized>(reader: &R, pair: Address) -> Result<PairSnapshot, HostError> {
    let (token0, token1) = reader.pair_tokens(pair)?;
    let (reserve0, reserve1) = reader.pair_reserves(pair)?;
    Ok(PairSnapshot {
        pair,
        token0,
        token1,
        reserve0,
        reserve1,
        total_supply: reader.pair_total_supply(pair)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryHost;

    const PNG: Address = Address::repeat_byte(0x11);
    const WAVAX: Address = Address::repeat_byte(0x22);
    const VSO: Address = Address::repeat_byte(0x33);
    const PAIR_PNG_WAVAX: Address = Address::repeat_byte(0x41);
    const PAIR_WAVAX_VSO: Address = Address::repeat_byte(0x42);
    const PAIR_PNG_VSO: Address = Address::repeat_byte(0x43);
    const VAULT: Address = Address::repeat_byte(0x77);

    fn host_with_pairs() -> MemoryHost {
        let mut host = MemoryHost::new();
        host.add_pair(
            PAIR_PNG_WAVAX,
            WAVAX,
            PNG,
            U256::from(1_000_000u64),
            U256::from(4_000_000u64),
        );
        host.add_pair(
            PAIR_WAVAX_VSO,
            WAVAX,
            VSO,
            U256::from(2_000_000u64),
            U256::from(2_000_000u64),
        );
        host.add_pair(
            PAIR_PNG_VSO,
            VSO,
            PNG,
            U256::from(1_000_000u64),
            U256::from(2_000_000u64),
        );
        host
    }

    #[test]
    fn test_identity_route() {
        let host = host_with_pairs();
        let router = SwapRouter::resolve(&host, PNG, PNG, None, None).unwrap();
        assert!(router.hops().is_empty());
        assert_eq!(router.quote(&host, U256::from(42u64)).unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_two_hop_route() {
        let host = host_with_pairs();
        let router =
            SwapRouter::resolve(&host, PNG, VSO, Some(PAIR_PNG_WAVAX), Some(PAIR_WAVAX_VSO))
                .unwrap();

        assert_eq!(router.hops().len(), 2);
        assert_eq!(router.hops()[0].token_out, WAVAX);
        assert_eq!(router.hops()[1].token_out, VSO);
    }

    #[test]
    fn test_route_must_reach_deposit_token() {
        let host = host_with_pairs();
        let err = SwapRouter::resolve(&host, PNG, VSO, Some(PAIR_PNG_WAVAX), None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));

        // No pairs only works when reward and deposit token coincide
        let err = SwapRouter::resolve(&host, PNG, WAVAX, None, None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));
    }

    #[test]
    fn test_second_pair_without_first() {
        let host = host_with_pairs();
        let err = SwapRouter::resolve(&host, WAVAX, VSO, None, Some(PAIR_WAVAX_VSO)).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));
    }

    #[test]
    fn test_pair_not_trading_reward_token() {
        let host = host_with_pairs();
        let err = SwapRouter::resolve(&host, PNG, VSO, Some(PAIR_WAVAX_VSO), None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));
    }

    #[test]
    fn test_convert_matches_quote() {
        let mut host = host_with_pairs();
        let router =
            SwapRouter::resolve(&host, PNG, VSO, Some(PAIR_PNG_WAVAX), Some(PAIR_WAVAX_VSO))
                .unwrap();

        let amount_in = U256::from(10_000u64);
        host.mint(PNG, VAULT, amount_in);

        let quoted = router.quote(&host, amount_in).unwrap();
        let converted = router.convert(&mut host, VAULT, amount_in).unwrap();

        assert!(converted > U256::ZERO);
        assert_eq!(quoted, converted);
        assert_eq!(host.balance_of(VSO, VAULT), converted);
        assert!(host.balance_of(PNG, VAULT).is_zero());
        assert!(host.balance_of(WAVAX, VAULT).is_zero());
    }

    #[test]
    fn test_convert_dust_skips_swaps() {
        let mut host = host_with_pairs();
        let router =
            SwapRouter::resolve(&host, PNG, WAVAX, Some(PAIR_PNG_WAVAX), None).unwrap();
        host.mint(PNG, VAULT, U256::from(1u64));

        // 1 PNG buys 0 WAVAX at a 4:1 price
        let converted = router.convert(&mut host, VAULT, U256::from(1u64)).unwrap();
        assert!(converted.is_zero());
        assert_eq!(host.balance_of(PNG, VAULT), U256::from(1u64));
    }

    #[test]
    fn test_liquidity_route_assigns_pairs_by_side() {
        let host = host_with_pairs();
        // Listed in the opposite order to the deposit pair's sides
        let router = SwapRouter::resolve(
            &host,
            PNG,
            PAIR_WAVAX_VSO,
            Some(PAIR_PNG_VSO),
            Some(PAIR_PNG_WAVAX),
        )
        .unwrap();

        assert_eq!(router.liquidity_pair(), Some(PAIR_WAVAX_VSO));
        let hops = router.hops();
        assert_eq!(hops.len(), 2);
        assert_eq!((hops[0].pair, hops[0].token_out), (PAIR_PNG_WAVAX, WAVAX));
        assert_eq!((hops[1].pair, hops[1].token_out), (PAIR_PNG_VSO, VSO));
    }

    #[test]
    fn test_liquidity_convert_matches_quote() {
        let mut host = host_with_pairs();
        let router = SwapRouter::resolve(
            &host,
            PNG,
            PAIR_WAVAX_VSO,
            Some(PAIR_PNG_WAVAX),
            Some(PAIR_PNG_VSO),
        )
        .unwrap();

        let amount_in = U256::from(10_001u64);
        host.mint(PNG, VAULT, amount_in);
        let supply_before = host.pair_total_supply(PAIR_WAVAX_VSO).unwrap();

        let quoted = router.quote(&host, amount_in).unwrap();
        let minted = router.convert(&mut host, VAULT, amount_in).unwrap();

        assert!(minted > U256::ZERO);
        assert_eq!(quoted, minted);
        assert_eq!(host.balance_of(PAIR_WAVAX_VSO, VAULT), minted);
        assert_eq!(host.pair_total_supply(PAIR_WAVAX_VSO).unwrap(), supply_before + minted);
        // The odd unit is never split
        assert_eq!(host.balance_of(PNG, VAULT), U256::from(1u64));
    }

    #[test]
    fn test_liquidity_route_swaps_through_deposit_pair() {
        let mut host = host_with_pairs();
        // Reward is one side of the deposit pair, so no swap pairs are needed
        let router = SwapRouter::resolve(&host, PNG, PAIR_PNG_WAVAX, None, None).unwrap();

        let hops = router.hops();
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].pair, PAIR_PNG_WAVAX);
        assert_eq!(hops[0].token_out, WAVAX);

        let amount_in = U256::from(10_000u64);
        host.mint(PNG, VAULT, amount_in);
        let quoted = router.quote(&host, amount_in).unwrap();
        let minted = router.convert(&mut host, VAULT, amount_in).unwrap();

        assert!(minted > U256::ZERO);
        assert_eq!(quoted, minted);
        assert_eq!(host.balance_of(PAIR_PNG_WAVAX, VAULT), minted);
    }

    #[test]
    fn test_liquidity_route_rejects_unusable_pairs() {
        let host = host_with_pairs();

        // Nothing buys either side of WAVAX-VSO from PNG
        let err = SwapRouter::resolve(&host, PNG, PAIR_WAVAX_VSO, None, None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));

        // PNG-VSO has no side to buy in PNG-WAVAX
        let err = SwapRouter::resolve(&host, PNG, PAIR_PNG_WAVAX, Some(PAIR_PNG_VSO), None).unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));

        let err = SwapRouter::resolve(
            &host,
            PNG,
            PAIR_WAVAX_VSO,
            Some(PAIR_PNG_VSO),
            Some(PAIR_PNG_VSO),
        )
        .unwrap_err();
        assert!(matches!(err, VaultError::InvalidRoute(_)));
    }

    #[test]
    fn test_liquidity_dust_skips_swaps() {
        let mut host = host_with_pairs();
        let router = SwapRouter::resolve(&host, PNG, PAIR_PNG_WAVAX, None, None).unwrap();
        host.mint(PNG, VAULT, U256::from(1u64));

        let minted = router.convert(&mut host, VAULT, U256::from(1u64)).unwrap();
        assert!(minted.is_zero());
        assert_eq!(host.balance_of(PNG, VAULT), U256::from(1u64));
    }
}
