//! On-chain reads for quoting and monitoring
//!
//! Reads live V2 pair state so the swap route can be quoted against real
//! reserves, and reads the monitoring views of a deployed vault. Read-only:
//! nothing here signs or sends transactions.
//!
//! Pair token ordering never changes, so it is cached per pair for the life
//! of the process.

use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_sol_types::{sol, SolCall};
use eyre::{eyre, Result};
use futures::future::try_join_all;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::host::{HostError, PairReader};
use crate::router::amm::PairSnapshot;

lazy_static! {
    /// (token0, token1) per pair
    static ref PAIR_TOKENS_CACHE: RwLock<HashMap<Address, (Address, Address)>> = RwLock::new(HashMap::new());
}

// ============================================
// SOLIDITY INTERFACES
// ============================================

sol! {
    /// Uniswap V2 Pair interface
    #[derive(Debug)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (
            uint112 reserve0,
            uint112 reserve1,
            uint32 blockTimestampLast
        );
        function token0() external view returns (address);
        function token1() external view returns (address);
        function totalSupply() external view returns (uint256);
    }

    /// Monitoring views of a deployed auto-compounding vault
    #[derive(Debug)]
    interface IYakStrategy {
        function checkReward() external view returns (uint256);
        function estimateDeployedBalance() external view returns (uint256);
        function estimateReinvestReward() external view returns (uint256);
        function totalDeposits() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function MIN_TOKENS_TO_REINVEST() external view returns (uint256);
    }
}

/// Snapshots of several pairs, readable by the swap router
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PairBook {
    pairs: HashMap<Address, PairSnapshot>,
}

impl PairBook {
    pub fn new(snapshots: impl IntoIterator<Item = PairSnapshot>) -> Self {
        Self {
            pairs: snapshots.into_iter().map(|s| (s.pair, s)).collect(),
        }
    }

    pub fn insert(&mut self, snapshot: PairSnapshot) {
        self.pairs.insert(snapshot.pair, snapshot);
    }

    pub fn get(&self, pair: Address) -> Option<&PairSnapshot> {
        self.pairs.get(&pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PairReader for PairBook {
    fn pair_tokens(&self, pair: Address) -> Result<(Address, Address), HostError> {
        self.get(pair)
            .map(|s| (s.token0, s.token1))
            .ok_or(HostError::UnknownPair(pair))
    }

    fn pair_reserves(&self, pair: Address) -> Result<(U256, U256), HostError> {
        self.get(pair)
            .map(|s| (s.reserve0, s.reserve1))
            .ok_or(HostError::UnknownPair(pair))
    }

    fn pair_total_supply(&self, pair: Address) -> Result<U256, HostError> {
        self.get(pair)
            .map(|s| s.total_supply)
            .ok_or(HostError::UnknownPair(pair))
    }
}

/// What a deployed vault reports about itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStatus {
    pub vault: Address,
    pub pending_reward: U256,
    pub estimated_deployed_balance: U256,
    pub estimated_reinvest_reward: U256,
    pub total_deposits: U256,
    pub total_supply: U256,
    pub min_tokens_to_reinvest: U256,
}

impl VaultStatus {
    /// Whether a keeper calling `reinvest` now would be accepted
    pub fn reinvest_ready(&self) -> bool {
        !self.total_supply.is_zero() && self.pending_reward >= self.min_tokens_to_reinvest
    }
}

pub struct ChainReader {
    rpc_url: String,
}

impl ChainReader {
    pub fn new(rpc_url: String) -> Self {
        Self { rpc_url }
    }

    async fn call_contract(&self, to: Address, calldata: Vec<u8>) -> Result<Vec<u8>> {
        let provider = ProviderBuilder::new().connect_http(self.rpc_url.parse()?);

        let tx = TransactionRequest::default().to(to).input(calldata.into());

        let result = provider
            .call(tx)
            .await
            .map_err(|e| eyre!("eth_call to {:?} failed: {}", to, e))?;

        Ok(result.to_vec())
    }

    async fn pair_tokens(&self, pair: Address) -> Result<(Address, Address)> {
        let cached = PAIR_TOKENS_CACHE
            .read()
            .ok()
            .and_then(|cache| cache.get(&pair).copied());
        if let Some(tokens) = cached {
            return Ok(tokens);
        }

        let output = self
            .call_contract(pair, IUniswapV2Pair::token0Call {}.abi_encode())
            .await?;
        let token0 = IUniswapV2Pair::token0Call::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode token0: {}", e))?;

        let output = self
            .call_contract(pair, IUniswapV2Pair::token1Call {}.abi_encode())
            .await?;
        let token1 = IUniswapV2Pair::token1Call::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode token1: {}", e))?;

        if let Ok(mut cache) = PAIR_TOKENS_CACHE.write() {
            cache.insert(pair, (token0, token1));
            debug!("Cached tokens for pair {:?}", pair);
        }
        Ok((token0, token1))
    }

    pub async fn pair_snapshot(&self, pair: Address) -> Result<PairSnapshot> {
        let (token0, token1) = self.pair_tokens(pair).await?;

        let output = self
            .call_contract(pair, IUniswapV2Pair::getReservesCall {}.abi_encode())
            .await?;
        let reserves = IUniswapV2Pair::getReservesCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode reserves: {}", e))?;

        let reserve0: u128 = reserves.reserve0.to();
        let reserve1: u128 = reserves.reserve1.to();

        let output = self
            .call_contract(pair, IUniswapV2Pair::totalSupplyCall {}.abi_encode())
            .await?;
        let total_supply = IUniswapV2Pair::totalSupplyCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode totalSupply: {}", e))?;

        Ok(PairSnapshot {
            pair,
            token0,
            token1,
            reserve0: U256::from(reserve0),
            reserve1: U256::from(reserve1),
            total_supply,
        })
    }

    /// Read all `pairs` concurrently
    pub async fn pair_book(&self, pairs: &[Address]) -> Result<PairBook> {
        let snapshots = try_join_all(pairs.iter().map(|&pair| self.pair_snapshot(pair))).await?;
        Ok(PairBook::new(snapshots))
    }

    async fn view(&self, vault: Address, calldata: Vec<u8>, name: &str) -> Result<U256> {
        let output = self.call_contract(vault, calldata).await?;
        // Every monitored view returns a single uint256
        IYakStrategy::totalSupplyCall::abi_decode_returns(&output)
            .map_err(|e| eyre!("Failed to decode {}: {}", name, e))
    }

    pub async fn vault_status(&self, vault: Address) -> Result<VaultStatus> {
        let (
            pending_reward,
            estimated_deployed_balance,
            estimated_reinvest_reward,
            total_deposits,
            total_supply,
            min_tokens_to_reinvest,
        ) = tokio::try_join!(
            self.view(vault, IYakStrategy::checkRewardCall {}.abi_encode(), "checkReward"),
            self.view(
                vault,
                IYakStrategy::estimateDeployedBalanceCall {}.abi_encode(),
                "estimateDeployedBalance"
            ),
            self.view(
                vault,
                IYakStrategy::estimateReinvestRewardCall {}.abi_encode(),
                "estimateReinvestReward"
            ),
            self.view(vault, IYakStrategy::totalDepositsCall {}.abi_encode(), "totalDeposits"),
            self.view(vault, IYakStrategy::totalSupplyCall {}.abi_encode(), "totalSupply"),
            self.view(
                vault,
                IYakStrategy::MIN_TOKENS_TO_REINVESTCall {}.abi_encode(),
                "MIN_TOKENS_TO_REINVEST"
            ),
        )?;

        Ok(VaultStatus {
            vault,
            pending_reward,
            estimated_deployed_balance,
            estimated_reinvest_reward,
            total_deposits,
            total_supply,
            min_tokens_to_reinvest,
        })
    }

    /// Number of pairs with cached token ordering
    pub fn cache_size() -> usize {
        PAIR_TOKENS_CACHE.read().map(|c| c.len()).unwrap_or(0)
    }
}
