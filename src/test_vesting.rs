#![cfg(test)]
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, vec, Address, Env,
};

use crate::{CliffVesting, CliffVestingClient, LedgerError, VestingEntry};

// ── helpers ───────────────────────────────────────────────────

const GENESIS: u64 = 1_000_000;
const START: u64 = 2_594_300_170;
const DURATION: u64 = 31_556_926; // 12 months
const CLIFF_OFFSET: u64 = 2_592_000; // 30 days

struct Setup {
    env: Env,
    client: CliffVestingClient<'static>,
    token: token::Client<'static>,
    admin: Address,
    user: Address,
    user2: Address,
}

fn setup() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = GENESIS);

    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(token_admin);
    let contract_id = env.register_contract(None, CliffVesting);
    let client = CliffVestingClient::new(&env, &contract_id);
    let token_client = token::Client::new(&env, &token_id);

    client.initialize(&admin, &token_id, &START);
    token::StellarAssetClient::new(&env, &token_id).mint(&contract_id, &100_000);

    Setup {
        env: env.clone(),
        client,
        token: token_client,
        admin,
        user: Address::generate(&env),
        user2: Address::generate(&env),
    }
}

fn schedule_two_users(s: &Setup) {
    let entries = vec![
        &s.env,
        VestingEntry {
            beneficiary: s.user.clone(),
            total_amount: 10_000,
            initial_amount: 100,
            claim_start_time: START + CLIFF_OFFSET,
            duration: DURATION,
        },
        VestingEntry {
            beneficiary: s.user2.clone(),
            total_amount: 20_000,
            initial_amount: 200,
            claim_start_time: START + CLIFF_OFFSET,
            duration: DURATION,
        },
    ];
    s.client.set_schedule(&s.admin, &entries);
}

// ── initialization ────────────────────────────────────────────

#[test]
fn initialize_twice_fails() {
    let s = setup();
    let result = s.client.try_initialize(&s.admin, &s.token.address, &START);
    assert_eq!(result, Err(Ok(LedgerError::AlreadyInitialized)));
}

#[test]
fn initialize_rejects_start_before_now() {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = GENESIS);
    let admin = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, CliffVesting);
    let client = CliffVestingClient::new(&env, &contract_id);

    let result = client.try_initialize(&admin, &token_id, &(GENESIS - 1));
    assert_eq!(result, Err(Ok(LedgerError::InvalidStartDate)));
}

// ── schedule management ───────────────────────────────────────

#[test]
fn set_schedule_persists_records_and_totals() {
    let s = setup();
    schedule_two_users(&s);

    let record = s.client.get_vesting(&s.user);
    assert_eq!(record.beneficiary, s.user);
    assert_eq!(record.total_amount, 10_000);
    assert_eq!(record.initial_amount, 100);
    assert_eq!(record.claimed_amount, 0);
    assert!(!record.initial_claimed);
    assert!(!record.terminated);

    let record2 = s.client.get_vesting(&s.user2);
    assert_eq!(record2.total_amount, 20_000);

    assert_eq!(s.client.get_total_vesting_amount(), 30_000);
    assert_eq!(s.client.get_total_claimed(), 0);
}

#[test]
fn set_schedule_rejects_existing_beneficiary() {
    let s = setup();
    schedule_two_users(&s);

    let entries = vec![
        &s.env,
        VestingEntry {
            beneficiary: s.user.clone(),
            total_amount: 5_000,
            initial_amount: 0,
            claim_start_time: START,
            duration: DURATION,
        },
    ];
    let result = s.client.try_set_schedule(&s.admin, &entries);
    assert_eq!(result, Err(Ok(LedgerError::VestingExists)));
}

#[test]
fn set_schedule_batch_is_all_or_nothing() {
    let s = setup();
    schedule_two_users(&s);
    let newcomer = Address::generate(&s.env);

    // A batch containing one duplicate must not create the newcomer either.
    let entries = vec![
        &s.env,
        VestingEntry {
            beneficiary: newcomer.clone(),
            total_amount: 1_000,
            initial_amount: 10,
            claim_start_time: START,
            duration: DURATION,
        },
        VestingEntry {
            beneficiary: s.user.clone(),
            total_amount: 5_000,
            initial_amount: 0,
            claim_start_time: START,
            duration: DURATION,
        },
    ];
    let result = s.client.try_set_schedule(&s.admin, &entries);
    assert_eq!(result, Err(Ok(LedgerError::VestingExists)));
    assert_eq!(
        s.client.try_get_vesting(&newcomer),
        Err(Ok(LedgerError::NoVesting))
    );
    assert_eq!(s.client.get_total_vesting_amount(), 30_000);
}

#[test]
fn set_schedule_rejects_inconsistent_amounts() {
    let s = setup();
    let entries = vec![
        &s.env,
        VestingEntry {
            beneficiary: s.user.clone(),
            total_amount: 100,
            initial_amount: 200,
            claim_start_time: START,
            duration: DURATION,
        },
    ];
    let result = s.client.try_set_schedule(&s.admin, &entries);
    assert_eq!(result, Err(Ok(LedgerError::InvalidAmount)));
}

#[test]
fn set_schedule_requires_admin() {
    let s = setup();
    let entries = vec![
        &s.env,
        VestingEntry {
            beneficiary: s.user.clone(),
            total_amount: 10_000,
            initial_amount: 100,
            claim_start_time: START + CLIFF_OFFSET,
            duration: DURATION,
        },
    ];
    let result = s.client.try_set_schedule(&s.user, &entries);
    assert_eq!(result, Err(Ok(LedgerError::NotAuthorized)));
}

// ── start date ────────────────────────────────────────────────

#[test]
fn set_start_date_requires_admin() {
    let s = setup();
    let result = s.client.try_set_start_date(&s.user, &(START + 1));
    assert_eq!(result, Err(Ok(LedgerError::NotAuthorized)));
}

#[test]
fn set_start_date_rejects_dates_before_genesis() {
    let s = setup();
    let result = s.client.try_set_start_date(&s.admin, &(GENESIS - 1));
    assert_eq!(result, Err(Ok(LedgerError::InvalidStartDate)));
}

#[test]
fn set_start_date_updates() {
    let s = setup();
    s.client.set_start_date(&s.admin, &(START + 100));
    assert_eq!(s.client.get_start_date(), START + 100);
}

// ── claiming ──────────────────────────────────────────────────

#[test]
fn claim_before_start_fails() {
    let s = setup();
    schedule_two_users(&s);
    assert_eq!(
        s.client.try_claim(&s.user),
        Err(Ok(LedgerError::NotStarted))
    );
}

#[test]
fn claim_without_record_fails() {
    let s = setup();
    assert_eq!(s.client.try_claim(&s.user), Err(Ok(LedgerError::NoVesting)));
}

// Replays the reference distribution: two beneficiaries with a 12-month
// duration and a 30-day cliff after the start date.
#[test]
fn full_claim_lifecycle_floor_division_exact() {
    let s = setup();
    schedule_two_users(&s);

    // Initial amount unlocks right after the start date, before the cliff.
    s.env.ledger().with_mut(|l| l.timestamp = START + 7_200);
    assert_eq!(s.client.claim(&s.user), 100);
    assert_eq!(s.token.balance(&s.user), 100);
    assert_eq!(s.client.claim(&s.user2), 200);
    assert_eq!(s.token.balance(&s.user2), 200);

    // Linear portion is still gated by the cliff.
    assert_eq!(
        s.client.try_claim(&s.user),
        Err(Ok(LedgerError::CliffNotReached))
    );

    // 30 days + 2h after start: (2592000 * 9900) / 31556926 = 813.
    s.env
        .ledger()
        .with_mut(|l| l.timestamp = START + CLIFF_OFFSET + 7_200);
    assert_eq!(s.client.claim(&s.user), 813);
    assert_eq!(s.token.balance(&s.user), 913);

    // Claiming again with no elapsed time yields 0.
    assert_eq!(s.client.claim(&s.user), 0);
    assert_eq!(s.token.balance(&s.user), 913);

    // Past the full duration the exact remainder is paid out.
    s.env
        .ledger()
        .with_mut(|l| l.timestamp = START + DURATION + 17_200);
    assert_eq!(s.client.claim(&s.user), 9_087);
    assert_eq!(s.token.balance(&s.user), 10_000);

    assert_eq!(s.client.get_total_claimed(), 10_200);
    let record = s.client.get_vesting(&s.user);
    assert_eq!(record.claimed_amount, record.total_amount);
}

#[test]
fn claim_at_exact_duration_releases_everything() {
    let s = setup();
    schedule_two_users(&s);
    s.env.ledger().with_mut(|l| l.timestamp = START + DURATION);
    assert_eq!(s.client.claim(&s.user), 10_000);
    assert_eq!(s.token.balance(&s.user), 10_000);
}

#[test]
fn initial_amount_is_claimable_exactly_once() {
    let s = setup();
    schedule_two_users(&s);
    s.env.ledger().with_mut(|l| l.timestamp = START);
    assert_eq!(s.client.claim(&s.user), 100);
    let record = s.client.get_vesting(&s.user);
    assert!(record.initial_claimed);
    assert_eq!(record.claimed_amount, 100);
    // A much later claim only adds the linear portion.
    s.env
        .ledger()
        .with_mut(|l| l.timestamp = START + CLIFF_OFFSET);
    assert_eq!(s.client.claim(&s.user), 813);
}

// ── termination ───────────────────────────────────────────────

#[test]
fn terminate_requires_admin() {
    let s = setup();
    schedule_two_users(&s);
    let result = s.client.try_terminate(&s.user, &s.user2);
    assert_eq!(result, Err(Ok(LedgerError::NotAuthorized)));
}

#[test]
fn terminated_beneficiary_cannot_claim_but_keeps_past_claims() {
    let s = setup();
    schedule_two_users(&s);

    s.env.ledger().with_mut(|l| l.timestamp = START + 7_200);
    assert_eq!(s.client.claim(&s.user2), 200);

    s.client.terminate(&s.admin, &s.user2);
    assert_eq!(
        s.client.try_claim(&s.user2),
        Err(Ok(LedgerError::VestingTerminated))
    );
    // Already-claimed tokens are not clawed back.
    assert_eq!(s.token.balance(&s.user2), 200);
    let record = s.client.get_vesting(&s.user2);
    assert!(record.terminated);
    assert_eq!(record.claimed_amount, 200);
}

#[test]
fn terminate_unknown_beneficiary_fails() {
    let s = setup();
    let stranger = Address::generate(&s.env);
    assert_eq!(
        s.client.try_terminate(&s.admin, &stranger),
        Err(Ok(LedgerError::NoVesting))
    );
}
