//! Vaults whose deposit token is a liquidity pair

use alloy_primitives::{Address, U256};
use autocompounder::host::{MemoryHost, StakingPool, TokenLedger};
use autocompounder::vault::{FeeSchedule, Vault, VaultConfig, VaultError, VaultInit};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const OWNER: Address = Address::repeat_byte(0xE0);
const DEPLOYER: Address = Address::repeat_byte(0xD0);
const KEEPER: Address = Address::repeat_byte(0xCC);
const VAULT: Address = Address::repeat_byte(0x77);

const PNG: Address = Address::repeat_byte(0x11);
const WAVAX: Address = Address::repeat_byte(0x22);
const VSO: Address = Address::repeat_byte(0x33);

const AVAX_PNG: Address = Address::repeat_byte(0x61);
const PNG_VSO: Address = Address::repeat_byte(0x62);
const AVAX_VSO: Address = Address::repeat_byte(0x63);

const AVAX_PNG_REWARDS: Address = Address::repeat_byte(0x51);
const AVAX_VSO_REWARDS: Address = Address::repeat_byte(0x52);

fn ether(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

fn user(i: usize) -> Address {
    Address::repeat_byte(0xA0 + i as u8)
}

/// PNG is worth 0.25 AVAX and VSO half a PNG in every pair
fn dex() -> MemoryHost {
    let mut host = MemoryHost::new();
    host.add_pair(AVAX_PNG, WAVAX, PNG, ether(1_000_000), ether(4_000_000));
    host.add_pair(PNG_VSO, PNG, VSO, ether(1_000_000), ether(2_000_000));
    host.add_pair(AVAX_VSO, VSO, WAVAX, ether(8_000_000), ether(1_000_000));
    host.add_pool(AVAX_PNG_REWARDS, AVAX_PNG, PNG);
    host.add_pool(AVAX_VSO_REWARDS, AVAX_VSO, PNG);
    for i in 0..3 {
        for lp in [AVAX_PNG, AVAX_VSO] {
            host.mint(lp, user(i), ether(1_000));
            host.approve(lp, user(i), VAULT, U256::MAX).unwrap();
        }
    }
    host
}

fn deploy(
    host: &mut MemoryHost,
    name: &str,
    deposit_token: Address,
    staking_contract: Address,
    pairs: (Option<Address>, Option<Address>),
) -> Result<Vault, VaultError> {
    Vault::deploy(
        host,
        DEPLOYER,
        VaultInit {
            config: VaultConfig {
                name: name.to_string(),
                address: VAULT,
                deposit_token,
                reward_token: PNG,
                staking_contract,
                swap_pair0: pairs.0,
                swap_pair1: pairs.1,
            },
            owner: OWNER,
            min_tokens_to_reinvest: U256::ZERO,
            fees: FeeSchedule::new(100, 100, 500).unwrap(),
        },
    )
}

fn pgl_avax_png(host: &mut MemoryHost) -> Vault {
    deploy(host, "Yield Yak: PGL AVAX-PNG", AVAX_PNG, AVAX_PNG_REWARDS, (None, None)).unwrap()
}

fn pgl_avax_vso(host: &mut MemoryHost) -> Vault {
    deploy(
        host,
        "Yield Yak: PGL AVAX-VSO",
        AVAX_VSO,
        AVAX_VSO_REWARDS,
        (Some(PNG_VSO), Some(AVAX_PNG)),
    )
    .unwrap()
}

/// One deposit, one reward, one reinvest; the restake must match the estimate
fn assert_compounds(host: &mut MemoryHost, vault: &mut Vault, pool: Address, lp: Address) {
    vault.deposit(host, user(0), ether(100)).unwrap();
    host.distribute_rewards(pool, ether(10)).unwrap();

    let estimate = vault.estimate_deployed_balance(&*host);
    let report = vault.reinvest(host, KEEPER).unwrap();

    assert!(report.restaked > U256::ZERO);
    assert_eq!(vault.total_deposits(), ether(100) + report.restaked);
    assert_eq!(vault.total_deposits(), estimate);
    assert_eq!(host.staked_balance(pool, VAULT), vault.total_deposits());
    assert_eq!(host.balance_of(PNG, KEEPER), ether(10) / U256::from(20u64));

    let shares = vault.balance_of(user(0));
    let returned = vault.withdraw(host, user(0), shares).unwrap();
    assert!(returned > ether(100));
    assert_eq!(host.balance_of(lp, user(0)), ether(900) + returned);
    assert!(vault.total_supply().is_zero());
    assert!(vault.total_deposits().is_zero());
}

#[test]
fn test_pgl_avax_png_needs_no_swap_pairs() {
    let mut host = dex();
    let mut vault = pgl_avax_png(&mut host);

    // PNG is one side already; the AVAX half swaps through the staked pair
    assert_eq!(vault.router().liquidity_pair(), Some(AVAX_PNG));
    let hops = vault.router().hops();
    assert_eq!(hops.len(), 1);
    assert_eq!((hops[0].pair, hops[0].token_out), (AVAX_PNG, WAVAX));

    assert_compounds(&mut host, &mut vault, AVAX_PNG_REWARDS, AVAX_PNG);
}

#[test]
fn test_pgl_avax_vso_buys_each_side() {
    let mut host = dex();
    let mut vault = pgl_avax_vso(&mut host);

    assert_eq!(vault.router().liquidity_pair(), Some(AVAX_VSO));
    let hops = vault.router().hops();
    assert_eq!(hops.len(), 2);
    assert_eq!((hops[0].pair, hops[0].token_out), (PNG_VSO, VSO));
    assert_eq!((hops[1].pair, hops[1].token_out), (AVAX_PNG, WAVAX));

    assert_compounds(&mut host, &mut vault, AVAX_VSO_REWARDS, AVAX_VSO);
}

#[test]
fn test_liquidity_vault_rejects_unusable_pairs() {
    let mut host = dex();

    let err = deploy(&mut host, "no route", AVAX_VSO, AVAX_VSO_REWARDS, (None, None)).unwrap_err();
    assert!(matches!(err, VaultError::InvalidRoute(_)));

    let err = deploy(
        &mut host,
        "stray pair",
        AVAX_PNG,
        AVAX_PNG_REWARDS,
        (Some(PNG_VSO), None),
    )
    .unwrap_err();
    assert!(matches!(err, VaultError::InvalidRoute(_)));
}

#[test]
fn test_liquidity_dust_reward_stays_idle() {
    let mut host = dex();
    let mut vault = pgl_avax_png(&mut host);
    vault.deposit(&mut host, user(0), ether(100)).unwrap();

    host.distribute_rewards(AVAX_PNG_REWARDS, U256::from(1u64)).unwrap();
    let report = vault.reinvest(&mut host, KEEPER).unwrap();

    assert!(report.restaked.is_zero());
    assert_eq!(vault.total_deposits(), ether(100));
    assert_eq!(host.balance_of(PNG, VAULT), U256::from(1u64));
}

#[test]
fn test_liquidity_vault_sequences_keep_stake_in_step() {
    let mut rng = StdRng::seed_from_u64(11);
    let mut host = dex();
    let mut vault = pgl_avax_vso(&mut host);

    for _ in 0..40 {
        let who = user(rng.gen_range(0..3));
        match rng.gen_range(0..3) {
            0 => {
                let amount = ether(rng.gen_range(1u64..50));
                vault.deposit(&mut host, who, amount).unwrap();
            }
            1 => {
                let shares = vault.balance_of(who) / U256::from(2u64);
                if !shares.is_zero() {
                    vault.withdraw(&mut host, who, shares).unwrap();
                }
            }
            _ => {
                host.distribute_rewards(AVAX_VSO_REWARDS, ether(rng.gen_range(1u64..20)))
                    .unwrap();
                match vault.reinvest(&mut host, KEEPER) {
                    Ok(_) | Err(VaultError::EmptyVault) => {}
                    Err(e) => panic!("reinvest failed: {e}"),
                }
            }
        }

        assert_eq!(host.staked_balance(AVAX_VSO_REWARDS, VAULT), vault.total_deposits());
        assert_eq!(vault.total_supply().is_zero(), vault.total_deposits().is_zero());
    }

    for i in 0..3 {
        let shares = vault.balance_of(user(i));
        if !shares.is_zero() {
            vault.withdraw(&mut host, user(i), shares).unwrap();
        }
    }
    assert!(vault.total_supply().is_zero());
    assert!(vault.total_deposits().is_zero());
}
