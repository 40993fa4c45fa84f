//! Share Ledger
//!
//! Per-depositor share balances plus the two totals that price a share:
//! `total_supply` (shares) and `total_deposits` (deposit tokens the vault
//! holds on depositors' behalf). Conversions always round down, so neither
//! minting nor redeeming can create value.
//!
//! Shares are also a transferable receipt token with ERC20-style allowances.

use alloy_primitives::{Address, U256};
use std::collections::HashMap;

use super::VaultError;

pub const SHARE_SYMBOL: &str = "YRT";

pub const SHARE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLedger {
    balances: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), U256>,
    total_supply: U256,
    total_deposits: U256,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn total_deposits(&self) -> U256 {
        self.total_deposits
    }

    pub fn balance_of(&self, account: Address) -> U256 {
        self.balances.get(&account).copied().unwrap_or_default()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or_default()
    }

    /// Number of holders with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Shares minted for depositing `amount`; 1:1 while the vault is empty.
    pub fn shares_for_deposit(&self, amount: U256) -> Result<U256, VaultError> {
        if self.total_supply.is_zero() || self.total_deposits.is_zero() {
            return Ok(amount);
        }
        mul_div(amount, self.total_supply, self.total_deposits)
    }

    /// Deposit tokens redeemable for `shares`; zero while the vault is empty.
    pub fn deposit_tokens_for_shares(&self, shares: U256) -> Result<U256, VaultError> {
        if self.total_supply.is_zero() || self.total_deposits.is_zero() {
            return Ok(U256::ZERO);
        }
        mul_div(shares, self.total_deposits, self.total_supply)
    }

    pub fn mint(&mut self, account: Address, shares: U256) -> Result<(), VaultError> {
        let total_supply = self
            .total_supply
            .checked_add(shares)
            .ok_or(VaultError::ArithmeticOverflow)?;
        let balance = self.balance_of(account) + shares;

        self.total_supply = total_supply;
        self.set_balance(account, balance);
        Ok(())
    }

    pub fn burn(&mut self, account: Address, shares: U256) -> Result<(), VaultError> {
        let available = self.balance_of(account);
        if available < shares {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                available,
            });
        }

        self.set_balance(account, available - shares);
        self.total_supply -= shares;
        Ok(())
    }

    pub fn add_deposits(&mut self, amount: U256) -> Result<(), VaultError> {
        self.total_deposits = self
            .total_deposits
            .checked_add(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    pub fn remove_deposits(&mut self, amount: U256) -> Result<(), VaultError> {
        self.total_deposits = self
            .total_deposits
            .checked_sub(amount)
            .ok_or(VaultError::ArithmeticOverflow)?;
        Ok(())
    }

    /// Overwrite the deposit baseline (rescue only).
    pub fn reset_deposits(&mut self, amount: U256) {
        self.total_deposits = amount;
    }

    pub fn transfer(&mut self, from: Address, to: Address, shares: U256) -> Result<(), VaultError> {
        let available = self.balance_of(from);
        if available < shares {
            return Err(VaultError::InsufficientShares {
                requested: shares,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        self.set_balance(from, available - shares);
        let received = self.balance_of(to) + shares;
        self.set_balance(to, received);
        Ok(())
    }

    pub fn approve(&mut self, owner: Address, spender: Address, shares: U256) {
        if shares.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), shares);
        }
    }

    /// Consume `shares` of `spender`'s allowance over `owner`'s balance.
    pub fn spend_allowance(
        &mut self,
        owner: Address,
        spender: Address,
        shares: U256,
    ) -> Result<(), VaultError> {
        let allowed = self.allowance(owner, spender);
        if allowed == U256::MAX {
            return Ok(());
        }
        if allowed < shares {
            return Err(VaultError::InsufficientShareAllowance {
                requested: shares,
                available: allowed,
            });
        }
        self.approve(owner, spender, allowed - shares);
        Ok(())
    }

    fn set_balance(&mut self, account: Address, balance: U256) {
        if balance.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}

/// floor(a * b / denominator) with overflow reported instead of wrapped
fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, VaultError> {
    a.checked_mul(b)
        .and_then(|product| product.checked_div(denominator))
        .ok_or(VaultError::ArithmeticOverflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::repeat_byte(0x0A);
    const BOB: Address = Address::repeat_byte(0x0B);

    fn ledger(total_supply: u64, total_deposits: u64) -> ShareLedger {
        let mut ledger = ShareLedger::new();
        ledger.mint(ALICE, U256::from(total_supply)).unwrap();
        ledger.add_deposits(U256::from(total_deposits)).unwrap();
        ledger
    }

    #[test]
    fn test_first_deposit_is_one_to_one() {
        let ledger = ShareLedger::new();
        let amount = U256::from(100u64) * U256::from(10u64).pow(U256::from(18));
        assert_eq!(ledger.shares_for_deposit(amount).unwrap(), amount);
        assert!(ledger.deposit_tokens_for_shares(amount).unwrap().is_zero());
    }

    #[test]
    fn test_conversions_round_down() {
        // 3 shares backed by 10 tokens
        let ledger = ledger(3, 10);
        assert_eq!(ledger.shares_for_deposit(U256::from(7u64)).unwrap(), U256::from(2u64));
        assert_eq!(ledger.deposit_tokens_for_shares(U256::from(1u64)).unwrap(), U256::from(3u64));
        assert_eq!(ledger.deposit_tokens_for_shares(U256::from(3u64)).unwrap(), U256::from(10u64));
    }

    #[test]
    fn test_round_trip_never_gains() {
        let ledger = ledger(997, 1_013);
        for x in [1u64, 2, 3, 50, 999, 1_000, 123_456] {
            let x = U256::from(x);
            let shares = ledger.shares_for_deposit(x).unwrap();
            let back = ledger.deposit_tokens_for_shares(shares).unwrap();
            assert!(back <= x, "round trip of {} gave {}", x, back);
        }
    }

    #[test]
    fn test_burn_more_than_balance() {
        let mut ledger = ledger(10, 10);
        let err = ledger.burn(ALICE, U256::from(11u64)).unwrap_err();
        assert_eq!(
            err,
            VaultError::InsufficientShares {
                requested: U256::from(11u64),
                available: U256::from(10u64),
            }
        );
        assert_eq!(ledger.total_supply(), U256::from(10u64));
    }

    #[test]
    fn test_full_burn_removes_holder() {
        let mut ledger = ledger(10, 10);
        ledger.burn(ALICE, U256::from(10u64)).unwrap();
        assert_eq!(ledger.holder_count(), 0);
        assert!(ledger.total_supply().is_zero());
    }

    #[test]
    fn test_mul_div_overflow_is_reported() {
        let ledger = ledger(2, 1);
        let err = ledger.shares_for_deposit(U256::MAX).unwrap_err();
        assert_eq!(err, VaultError::ArithmeticOverflow);
    }

    #[test]
    fn test_transfer_and_allowance() {
        let mut ledger = ledger(10, 10);
        ledger.transfer(ALICE, BOB, U256::from(4u64)).unwrap();
        assert_eq!(ledger.balance_of(ALICE), U256::from(6u64));
        assert_eq!(ledger.balance_of(BOB), U256::from(4u64));
        assert_eq!(ledger.total_supply(), U256::from(10u64));

        ledger.approve(ALICE, BOB, U256::from(5u64));
        ledger.spend_allowance(ALICE, BOB, U256::from(3u64)).unwrap();
        assert_eq!(ledger.allowance(ALICE, BOB), U256::from(2u64));
        assert!(matches!(
            ledger.spend_allowance(ALICE, BOB, U256::from(3u64)),
            Err(VaultError::InsufficientShareAllowance { .. })
        ));
    }
}
