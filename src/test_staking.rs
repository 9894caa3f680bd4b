#![cfg(test)]
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, Address, Env, String as SdkString,
};

use crate::{staking::LOCK_PERIOD, LedgerError, Staking, StakingClient};

// ── helpers ───────────────────────────────────────────────────

const T: u64 = 1_690_000_000;
const YIELD_BPS: u32 = 5_000; // 50% bonus on unstake

struct Setup {
    env: Env,
    client: StakingClient<'static>,
    token: token::Client<'static>,
    contract_id: Address,
    admin: Address,
    operator: Address,
    user: Address,
}

fn setup(funding: i128) -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = T);

    let admin = Address::generate(&env);
    let operator = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, Staking);
    let client = StakingClient::new(&env, &contract_id);
    let token_sac = token::StellarAssetClient::new(&env, &token_id);

    client.initialize(&admin, &token_id, &operator, &YIELD_BPS);
    if funding > 0 {
        token_sac.mint(&contract_id, &funding);
    }

    Setup {
        client,
        token: token::Client::new(&env, &token_id),
        contract_id,
        admin,
        operator,
        user: Address::generate(&env),
        env,
    }
}

fn month(s: &Setup, label: &str) -> SdkString {
    SdkString::from_str(&s.env, label)
}

// ── staking ───────────────────────────────────────────────────

#[test]
fn only_operator_may_stake() {
    let s = setup(1_000);
    let result = s
        .client
        .try_stake(&s.user, &100, &s.user, &month(&s, "09/2023"));
    assert_eq!(result, Err(Ok(LedgerError::NotAuthorized)));
}

#[test]
fn stake_appends_records_per_period() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.client
        .stake(&s.operator, &2_000, &s.user, &month(&s, "09/2023"));

    let stakes = s.client.get_stakes(&s.user);
    assert_eq!(stakes.len(), 2);
    let first = stakes.get(0).unwrap();
    assert_eq!(first.amount, 1_000);
    assert_eq!(first.owner, s.user);
    assert_eq!(first.period_key, month(&s, "08/2023"));
    assert_eq!(first.deposit_time, T);
}

#[test]
fn duplicate_period_for_same_owner_fails() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    let result = s
        .client
        .try_stake(&s.operator, &2_000, &s.user, &month(&s, "08/2023"));
    assert_eq!(result, Err(Ok(LedgerError::DuplicatePeriod)));
    assert_eq!(s.client.get_stakes(&s.user).len(), 1);
}

#[test]
fn same_period_for_different_owners_is_fine() {
    let s = setup(10_000);
    let other = Address::generate(&s.env);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.client
        .stake(&s.operator, &1_000, &other, &month(&s, "08/2023"));
    assert_eq!(s.client.get_stakes(&s.user).len(), 1);
    assert_eq!(s.client.get_stakes(&other).len(), 1);
}

#[test]
fn stake_rejects_non_positive_amount() {
    let s = setup(10_000);
    let result = s
        .client
        .try_stake(&s.operator, &0, &s.user, &month(&s, "08/2023"));
    assert_eq!(result, Err(Ok(LedgerError::InvalidAmount)));
}

// ── unstaking ─────────────────────────────────────────────────

#[test]
fn unstake_with_no_stakes_fails() {
    let s = setup(10_000);
    assert_eq!(
        s.client.try_unstake(&s.user, &0),
        Err(Ok(LedgerError::NoStake))
    );
}

#[test]
fn unstake_with_bad_index_fails() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    assert_eq!(
        s.client.try_unstake(&s.user, &2),
        Err(Ok(LedgerError::InvalidIndex))
    );
}

#[test]
fn unstake_before_lock_elapses_fails() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.env
        .ledger()
        .with_mut(|l| l.timestamp = T + LOCK_PERIOD - 1);
    assert_eq!(
        s.client.try_unstake(&s.user, &0),
        Err(Ok(LedgerError::LockNotElapsed))
    );
}

#[test]
fn unstake_fails_when_pool_cannot_cover_payout() {
    let s = setup(1_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.env.ledger().with_mut(|l| l.timestamp = T + LOCK_PERIOD);
    // Payout would be 1500 but the pool only holds 1000.
    assert_eq!(
        s.client.try_unstake(&s.user, &0),
        Err(Ok(LedgerError::InsufficientBalance))
    );
}

#[test]
fn unstake_pays_amount_plus_yield_and_removes_one_record() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.client
        .stake(&s.operator, &2_000, &s.user, &month(&s, "09/2023"));

    // The lock boundary itself is enough.
    s.env.ledger().with_mut(|l| l.timestamp = T + LOCK_PERIOD);
    assert_eq!(s.client.unstake(&s.user, &0), 1_500);
    assert_eq!(s.token.balance(&s.user), 1_500);

    let stakes = s.client.get_stakes(&s.user);
    assert_eq!(stakes.len(), 1);
    assert_eq!(stakes.get(0).unwrap().period_key, month(&s, "09/2023"));
}

#[test]
fn period_slot_reopens_after_unstake() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    s.env.ledger().with_mut(|l| l.timestamp = T + LOCK_PERIOD);
    s.client.unstake(&s.user, &0);
    s.client
        .stake(&s.operator, &500, &s.user, &month(&s, "08/2023"));
    assert_eq!(s.client.get_stakes(&s.user).len(), 1);
}

// ── roles & sweep ─────────────────────────────────────────────

#[test]
fn set_operator_requires_admin() {
    let s = setup(0);
    let new_operator = Address::generate(&s.env);
    assert_eq!(
        s.client.try_set_operator(&s.user, &new_operator),
        Err(Ok(LedgerError::NotAuthorized))
    );
    s.client.set_operator(&s.admin, &new_operator);
    assert_eq!(s.client.get_operator(), new_operator);
}

#[test]
fn withdraw_sweeps_entire_balance_regardless_of_stakes() {
    let s = setup(10_000);
    s.client
        .stake(&s.operator, &1_000, &s.user, &month(&s, "08/2023"));
    assert_eq!(
        s.client.try_withdraw(&s.user),
        Err(Ok(LedgerError::NotAuthorized))
    );
    assert_eq!(s.client.withdraw(&s.admin), 10_000);
    assert_eq!(s.token.balance(&s.contract_id), 0);
    assert_eq!(s.token.balance(&s.admin), 10_000);
}

#[test]
fn yield_rate_is_configuration_not_a_constant() {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = T);
    let admin = Address::generate(&env);
    let operator = Address::generate(&env);
    let user = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, Staking);
    let client = StakingClient::new(&env, &contract_id);
    client.initialize(&admin, &token_id, &operator, &2_500);
    token::StellarAssetClient::new(&env, &token_id).mint(&contract_id, &10_000);

    client.stake(&operator, &1_000, &user, &SdkString::from_str(&env, "08/2023"));
    env.ledger().with_mut(|l| l.timestamp = T + LOCK_PERIOD);
    assert_eq!(client.unstake(&user, &0), 1_250);
}
