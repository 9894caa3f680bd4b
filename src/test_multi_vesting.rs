#![cfg(test)]
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, vec, Address, Env, Vec,
};

use crate::{LedgerError, MultiVesting, MultiVestingClient};

// ── helpers ───────────────────────────────────────────────────

const T: u64 = 1_700_000_000;
const HOUR: u64 = 3_600;
const DAY: u64 = 86_400;
const DURATION: u64 = 10 * DAY;
const CAP: i128 = 100_000_000_000;

struct Setup {
    env: Env,
    client: MultiVestingClient<'static>,
    token: token::Client<'static>,
    admin: Address,
    user: Address,
}

/// Pool with one revocable vestor of share 100, a 10-day duration, 1-day
/// ticks, and a cliff one hour before the start date.
fn setup() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = T);

    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, MultiVesting);
    let client = MultiVestingClient::new(&env, &contract_id);

    client.initialize(
        &admin,
        &token_id,
        &T,
        &(T - HOUR),
        &DURATION,
        &DAY,
        &CAP,
        &vec![&env, (user.clone(), 100i128, 0i128, true)],
    );
    // The pool is funded after genesis, as in production.
    token::StellarAssetClient::new(&env, &token_id).mint(&contract_id, &1_000_000);

    Setup {
        env: env.clone(),
        client,
        token: token::Client::new(&env, &token_id),
        admin,
        user,
    }
}

fn at(s: &Setup, ts: u64) {
    s.env.ledger().with_mut(|l| l.timestamp = ts);
}

// ── tick vesting ──────────────────────────────────────────────

#[test]
fn vests_nothing_at_start() {
    let s = setup();
    assert_eq!(s.client.releasable_amount(&s.user), 0);
}

#[test]
fn vests_nothing_after_one_hour() {
    let s = setup();
    at(&s, T + HOUR);
    assert_eq!(s.client.releasable_amount(&s.user), 0);
}

#[test]
fn vests_nothing_just_before_first_tick() {
    let s = setup();
    at(&s, T + DAY - HOUR - 1);
    assert_eq!(s.client.releasable_amount(&s.user), 0);
}

#[test]
fn tick_schedule_releases_ten_percent_per_day() {
    let s = setup();
    at(&s, T + DAY + 1);
    assert_eq!(s.client.releasable_amount(&s.user), 10);
    at(&s, T + 3 * DAY + 1);
    assert_eq!(s.client.releasable_amount(&s.user), 30);
    at(&s, T + 10 * DAY + 1);
    assert_eq!(s.client.releasable_amount(&s.user), 100);
    // Ticks cap at the total duration.
    at(&s, T + 40 * DAY);
    assert_eq!(s.client.releasable_amount(&s.user), 100);
}

#[test]
fn release_transfers_and_resets_releasable() {
    let s = setup();
    at(&s, T + 3 * DAY + 1);
    assert_eq!(s.client.release(&s.user), 30);
    assert_eq!(s.token.balance(&s.user), 30);
    // Immediate second call yields 0.
    assert_eq!(s.client.releasable_amount(&s.user), 0);
    assert_eq!(s.client.release(&s.user), 0);
    assert_eq!(s.token.balance(&s.user), 30);

    at(&s, T + 4 * DAY + 1);
    assert_eq!(s.client.releasable_amount(&s.user), 10);

    at(&s, T + 10 * DAY + 1);
    assert_eq!(s.client.release(&s.user), 70);
    assert_eq!(s.token.balance(&s.user), 100);
}

#[test]
fn releasable_before_start_is_zero_even_with_initial_claimable() {
    let s = setup();
    let late = Address::generate(&s.env);
    at(&s, T - 2 * HOUR);
    s.client.add_vestor(&s.admin, &late, &80, &20, &false);
    assert_eq!(s.client.releasable_amount(&late), 0);
    // After the start but before the first tick only the initial claimable
    // portion is available.
    at(&s, T + HOUR);
    assert_eq!(s.client.releasable_amount(&late), 20);
    at(&s, T + DAY + 1);
    assert_eq!(s.client.releasable_amount(&late), 20 + 8);
}

// ── revocation ────────────────────────────────────────────────

#[test]
fn revoke_freezes_vesting_but_keeps_unclaimed() {
    let s = setup();
    at(&s, T + 3 * DAY + 1);
    assert_eq!(s.client.release(&s.user), 30);

    at(&s, T + 4 * DAY + 1);
    s.client.revoke_vestor(&s.admin, &s.user);

    // Vested-but-unclaimed at revoke time stays claimable...
    assert_eq!(s.client.releasable_amount(&s.user), 10);
    // ...but no further vesting accrues.
    at(&s, T + 5 * DAY + 1);
    assert_eq!(s.client.releasable_amount(&s.user), 10);
    at(&s, T + 30 * DAY);
    assert_eq!(s.client.releasable_amount(&s.user), 10);

    assert_eq!(s.client.release(&s.user), 10);
    assert_eq!(s.token.balance(&s.user), 40);
    assert_eq!(s.client.get_share(&s.user), 40);
}

#[test]
fn revoke_frees_unvested_remainder_from_the_pool() {
    let s = setup();
    assert_eq!(s.client.get_total_vested_tokens(), 100);
    at(&s, T + 4 * DAY + 1);
    s.client.revoke_vestor(&s.admin, &s.user);
    // 60 of the 100 committed units had not vested yet.
    assert_eq!(s.client.get_total_vested_tokens(), 40);
}

#[test]
fn revoke_requires_revocable_flag() {
    let s = setup();
    let fixed = Address::generate(&s.env);
    s.client.add_vestor(&s.admin, &fixed, &50, &0, &false);
    assert_eq!(
        s.client.try_revoke_vestor(&s.admin, &fixed),
        Err(Ok(LedgerError::NotRevocable))
    );
}

#[test]
fn revoke_twice_fails() {
    let s = setup();
    s.client.revoke_vestor(&s.admin, &s.user);
    assert_eq!(
        s.client.try_revoke_vestor(&s.admin, &s.user),
        Err(Ok(LedgerError::AlreadyRevoked))
    );
}

#[test]
fn revoke_requires_admin() {
    let s = setup();
    assert_eq!(
        s.client.try_revoke_vestor(&s.user, &s.user),
        Err(Ok(LedgerError::NotAuthorized))
    );
}

// ── pool capacity ─────────────────────────────────────────────

#[test]
fn add_vestor_boundary_is_exact() {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = T);
    let admin = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, MultiVesting);
    let client = MultiVestingClient::new(&env, &contract_id);
    let none: Vec<(Address, i128, i128, bool)> = Vec::new(&env);
    client.initialize(&admin, &token_id, &T, &T, &DURATION, &DAY, &CAP, &none);
    token::StellarAssetClient::new(&env, &token_id).mint(&contract_id, &500);

    // Committing exactly the held balance succeeds...
    let a = Address::generate(&env);
    client.add_vestor(&admin, &a, &500, &0, &true);
    assert_eq!(client.get_total_vested_tokens(), 500);

    // ...one unit more does not.
    let b = Address::generate(&env);
    assert_eq!(
        client.try_add_vestor(&admin, &b, &1, &0, &true),
        Err(Ok(LedgerError::InsufficientPool))
    );
}

#[test]
fn add_vestor_rejects_duplicates_and_requires_admin() {
    let s = setup();
    assert_eq!(
        s.client.try_add_vestor(&s.admin, &s.user, &10, &0, &true),
        Err(Ok(LedgerError::VestingExists))
    );
    let other = Address::generate(&s.env);
    assert_eq!(
        s.client.try_add_vestor(&s.user, &other, &10, &0, &true),
        Err(Ok(LedgerError::NotAuthorized))
    );
}

#[test]
fn initialize_validates_interval_and_cap() {
    let env = Env::default();
    env.mock_all_auths();
    let admin = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, MultiVesting);
    let client = MultiVestingClient::new(&env, &contract_id);
    let none: Vec<(Address, i128, i128, bool)> = Vec::new(&env);

    let result = client.try_initialize(&admin, &token_id, &T, &T, &DAY, &(2 * DAY), &CAP, &none);
    assert_eq!(result, Err(Ok(LedgerError::InvalidAmount)));
}

#[test]
fn initialize_checks_initial_vestors_against_cap() {
    let env = Env::default();
    env.mock_all_auths();
    let admin = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, MultiVesting);
    let client = MultiVestingClient::new(&env, &contract_id);
    let a = Address::generate(&env);
    let b = Address::generate(&env);

    let result = client.try_initialize(
        &admin,
        &token_id,
        &T,
        &T,
        &DURATION,
        &DAY,
        &100,
        &vec![&env, (a, 80i128, 0i128, true), (b, 30i128, 0i128, true)],
    );
    assert_eq!(result, Err(Ok(LedgerError::InsufficientPool)));
}

#[test]
fn unknown_beneficiary_has_no_releasable_amount() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_releasable_amount(&stranger),
        Err(Ok(LedgerError::NoVesting))
    );
    assert_eq!(
        s.client.try_release(&stranger),
        Err(Ok(LedgerError::NoVesting))
    );
}
