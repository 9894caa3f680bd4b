#![cfg(test)]
use ed25519_dalek::{Signer, SigningKey};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, Address, Bytes, BytesN, Env,
};

use crate::{subscription::BILLING_PERIOD, LedgerError, Subscription, SubscriptionClient};

// ── helpers ───────────────────────────────────────────────────

const T: u64 = 1_650_000_000;

struct Setup {
    env: Env,
    client: SubscriptionClient<'static>,
    token: token::Client<'static>,
    contract_id: Address,
    admin: Address,
    operator: SigningKey,
    user: Address,
}

fn setup() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().with_mut(|l| l.timestamp = T);

    let admin = Address::generate(&env);
    let user = Address::generate(&env);
    let operator = SigningKey::from_bytes(&[7u8; 32]);
    let operator_pk = BytesN::from_array(&env, &operator.verifying_key().to_bytes());

    let token_id = env.register_stellar_asset_contract(Address::generate(&env));
    let contract_id = env.register_contract(None, Subscription);
    let client = SubscriptionClient::new(&env, &contract_id);

    client.initialize(&admin, &token_id, &operator_pk);
    token::StellarAssetClient::new(&env, &token_id).mint(&user, &1_000);

    Setup {
        client,
        token: token::Client::new(&env, &token_id),
        contract_id,
        admin,
        operator,
        user,
        env,
    }
}

/// Sign the contract's payment message the way the off-chain operator would.
fn authorize(s: &Setup, key: &SigningKey, amount: i128, nonce: u64) -> BytesN<64> {
    let msg: Bytes = s.client.payment_message(&s.user, &amount, &nonce);
    let msg_bytes: std::vec::Vec<u8> = msg.iter().collect();
    BytesN::from_array(&s.env, &key.sign(&msg_bytes).to_bytes())
}

// ── subscribing ───────────────────────────────────────────────

#[test]
fn renew_without_subscription_fails() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 0);
    assert_eq!(
        s.client.try_renew_subscription(&s.user, &100, &sig, &0),
        Err(Ok(LedgerError::NoSubscription))
    );
}

#[test]
fn subscribe_creates_record_and_pulls_payment() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    let record = s.client.get_subscription(&s.user);
    assert_eq!(record.subscriber, s.user);
    assert_eq!(record.cumulative_amount, 100);
    assert_eq!(record.last_payment_time, T);
    assert_eq!(record.expiry_time, T + BILLING_PERIOD);

    assert_eq!(s.token.balance(&s.user), 900);
    assert_eq!(s.token.balance(&s.contract_id), 100);
}

#[test]
fn subscribe_twice_fails() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    let sig2 = authorize(&s, &s.operator, 50, 2);
    assert_eq!(
        s.client.try_subscribe(&s.user, &50, &sig2, &2),
        Err(Ok(LedgerError::AlreadySubscribed))
    );
    // The original record is untouched.
    assert_eq!(s.client.get_subscription(&s.user).cumulative_amount, 100);
}

#[test]
fn subscribe_rejects_non_positive_amount() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 0, 1);
    assert_eq!(
        s.client.try_subscribe(&s.user, &0, &sig, &1),
        Err(Ok(LedgerError::InvalidAmount))
    );
}

#[test]
#[should_panic]
fn subscribe_with_bad_signature_traps() {
    let s = setup();
    // Signed for a different amount than submitted.
    let sig = authorize(&s, &s.operator, 999, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);
}

#[test]
#[should_panic]
fn subscribe_with_foreign_key_traps() {
    let s = setup();
    let impostor = SigningKey::from_bytes(&[9u8; 32]);
    let sig = authorize(&s, &impostor, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);
}

// ── renewing ──────────────────────────────────────────────────

#[test]
fn renew_accumulates_amount_and_extends_expiry() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    // One billing period later the subscription has lapsed; renewing starts
    // a fresh period from now.
    let renew_at = T + BILLING_PERIOD + 50;
    s.env.ledger().with_mut(|l| l.timestamp = renew_at);
    let sig2 = authorize(&s, &s.operator, 200, 2);
    s.client.renew_subscription(&s.user, &200, &sig2, &2);

    let record = s.client.get_subscription(&s.user);
    assert_eq!(record.cumulative_amount, 300);
    assert_eq!(record.expiry_time, renew_at + BILLING_PERIOD);
    assert_eq!(s.token.balance(&s.contract_id), 300);
}

#[test]
fn early_renewal_extends_from_current_expiry() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    s.env.ledger().with_mut(|l| l.timestamp = T + 100);
    let sig2 = authorize(&s, &s.operator, 100, 2);
    s.client.renew_subscription(&s.user, &100, &sig2, &2);

    let record = s.client.get_subscription(&s.user);
    assert_eq!(record.expiry_time, T + 2 * BILLING_PERIOD);
}

#[test]
fn nonce_cannot_be_replayed() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    // Same signed authorization submitted again.
    assert_eq!(
        s.client.try_renew_subscription(&s.user, &100, &sig, &1),
        Err(Ok(LedgerError::NonceAlreadyUsed))
    );
}

// ── roles & sweep ─────────────────────────────────────────────

#[test]
fn set_operator_requires_admin_and_rotates_the_key() {
    let s = setup();
    let next = SigningKey::from_bytes(&[11u8; 32]);
    let next_pk = BytesN::from_array(&s.env, &next.verifying_key().to_bytes());

    assert_eq!(
        s.client.try_set_operator(&s.user, &next_pk),
        Err(Ok(LedgerError::NotAuthorized))
    );
    s.client.set_operator(&s.admin, &next_pk);
    assert_eq!(s.client.get_operator(), next_pk);

    // Authorizations from the new operator verify.
    let sig = authorize(&s, &next, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);
    assert_eq!(s.client.get_subscription(&s.user).cumulative_amount, 100);
}

#[test]
#[should_panic]
fn old_operator_key_stops_working_after_rotation() {
    let s = setup();
    let next = SigningKey::from_bytes(&[11u8; 32]);
    let next_pk = BytesN::from_array(&s.env, &next.verifying_key().to_bytes());
    s.client.set_operator(&s.admin, &next_pk);

    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);
}

#[test]
fn withdraw_sweeps_collected_payments_to_admin() {
    let s = setup();
    let sig = authorize(&s, &s.operator, 100, 1);
    s.client.subscribe(&s.user, &100, &sig, &1);

    assert_eq!(
        s.client.try_withdraw(&s.user),
        Err(Ok(LedgerError::NotAuthorized))
    );
    assert_eq!(s.client.withdraw(&s.admin), 100);
    assert_eq!(s.token.balance(&s.contract_id), 0);
    assert_eq!(s.token.balance(&s.admin), 100);
}
