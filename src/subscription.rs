//! Signature-authorized subscription billing.
//!
//! The operator (an off-chain billing service) signs `(subscriber, amount,
//! nonce)` with its ed25519 key; the subscriber submits the signature along
//! with the payment. Each authorization is single-use per subscriber, and a
//! record, once created, is only ever extended.

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, xdr::ToXdr, Address, Bytes, BytesN,
    Env, Symbol,
};

use crate::LedgerError;

const EVENT_SUBSCRIBE: Symbol = symbol_short!("subscribe");
const EVENT_RENEW: Symbol = symbol_short!("renew");
const EVENT_OPERATOR: Symbol = symbol_short!("operator");
const EVENT_WITHDRAW: Symbol = symbol_short!("withdraw");

/// One billing period: 30 days.
pub const BILLING_PERIOD: u64 = 2_592_000;

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionRecord {
    pub subscriber: Address,
    /// Sum of all billed amounts over the subscription's lifetime.
    pub cumulative_amount: i128,
    pub last_payment_time: u64,
    pub expiry_time: u64,
}

#[contracttype]
pub enum DataKey {
    Admin,
    Token,
    /// ed25519 public key of the billing operator.
    Operator,
    Sub(Address),
    /// Consumed authorization nonces, scoped per subscriber.
    UsedNonce(Address, u64),
}

#[contract]
pub struct Subscription;

#[contractimpl]
impl Subscription {
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        operator: BytesN<32>,
    ) -> Result<(), LedgerError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(LedgerError::AlreadyInitialized);
        }
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage().persistent().set(&DataKey::Token, &token);
        env.storage().persistent().set(&DataKey::Operator, &operator);
        Ok(())
    }

    /// Replace the operator signing key (admin only).
    pub fn set_operator(
        env: Env,
        caller: Address,
        operator: BytesN<32>,
    ) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Operator, &operator);
        env.events().publish((EVENT_OPERATOR, caller), operator);
        Ok(())
    }

    pub fn get_operator(env: Env) -> Result<BytesN<32>, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Operator)
            .ok_or(LedgerError::NotInitialized)
    }

    /// The exact byte string the operator must sign to authorize a payment:
    /// the subscriber address in XDR form, followed by the big-endian amount
    /// and nonce. Exposed so off-chain signers construct identical bytes.
    pub fn payment_message(env: Env, subscriber: Address, amount: i128, nonce: u64) -> Bytes {
        let mut msg = subscriber.to_xdr(&env);
        msg.append(&Bytes::from_array(&env, &amount.to_be_bytes()));
        msg.append(&Bytes::from_array(&env, &nonce.to_be_bytes()));
        msg
    }

    /// Open a subscription for the caller, pulling `amount` from their
    /// balance. The operator's signature over `(subscriber, amount, nonce)`
    /// must verify; an invalid signature traps in the host.
    pub fn subscribe(
        env: Env,
        subscriber: Address,
        amount: i128,
        signature: BytesN<64>,
        nonce: u64,
    ) -> Result<(), LedgerError> {
        subscriber.require_auth();
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let key = DataKey::Sub(subscriber.clone());
        if env.storage().persistent().has(&key) {
            return Err(LedgerError::AlreadySubscribed);
        }
        Self::consume_authorization(&env, &subscriber, amount, &signature, nonce)?;

        let now = env.ledger().timestamp();
        let record = SubscriptionRecord {
            subscriber: subscriber.clone(),
            cumulative_amount: amount,
            last_payment_time: now,
            expiry_time: now + BILLING_PERIOD,
        };
        env.storage().persistent().set(&key, &record);
        Self::pull_payment(&env, &subscriber, amount)?;
        env.events()
            .publish((EVENT_SUBSCRIBE, subscriber), (amount, nonce));
        Ok(())
    }

    /// Extend an existing subscription: accumulates the billed amount and
    /// pushes the expiry one billing period past the later of now and the
    /// current expiry, so renewing early never shortens a live subscription.
    pub fn renew_subscription(
        env: Env,
        subscriber: Address,
        amount: i128,
        signature: BytesN<64>,
        nonce: u64,
    ) -> Result<(), LedgerError> {
        subscriber.require_auth();
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let key = DataKey::Sub(subscriber.clone());
        let mut record: SubscriptionRecord = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(LedgerError::NoSubscription)?;
        Self::consume_authorization(&env, &subscriber, amount, &signature, nonce)?;

        let now = env.ledger().timestamp();
        record.cumulative_amount = record
            .cumulative_amount
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        record.last_payment_time = now;
        record.expiry_time = record.expiry_time.max(now) + BILLING_PERIOD;
        env.storage().persistent().set(&key, &record);
        Self::pull_payment(&env, &subscriber, amount)?;
        env.events()
            .publish((EVENT_RENEW, subscriber), (amount, nonce));
        Ok(())
    }

    pub fn get_subscription(
        env: Env,
        subscriber: Address,
    ) -> Result<SubscriptionRecord, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Sub(subscriber))
            .ok_or(LedgerError::NoSubscription)
    }

    /// Sweep the collected balance to the admin (admin only).
    pub fn withdraw(env: Env, caller: Address) -> Result<i128, LedgerError> {
        Self::require_admin(&env, &caller)?;
        let token_addr: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Token)
            .ok_or(LedgerError::NotInitialized)?;
        let token_client = token::Client::new(&env, &token_addr);
        let contract_addr = env.current_contract_address();
        let held = token_client.balance(&contract_addr);
        if held > 0 {
            token_client.transfer(&contract_addr, &caller, &held);
        }
        env.events().publish((EVENT_WITHDRAW, caller), held);
        Ok(held)
    }

    /// Check the nonce is fresh, verify the operator signature over the
    /// payment message, and mark the nonce consumed.
    fn consume_authorization(
        env: &Env,
        subscriber: &Address,
        amount: i128,
        signature: &BytesN<64>,
        nonce: u64,
    ) -> Result<(), LedgerError> {
        let nonce_key = DataKey::UsedNonce(subscriber.clone(), nonce);
        if env.storage().persistent().has(&nonce_key) {
            return Err(LedgerError::NonceAlreadyUsed);
        }
        let operator: BytesN<32> = env
            .storage()
            .persistent()
            .get(&DataKey::Operator)
            .ok_or(LedgerError::NotInitialized)?;
        let msg = Self::payment_message(env.clone(), subscriber.clone(), amount, nonce);
        env.crypto().ed25519_verify(&operator, &msg, signature);
        env.storage().persistent().set(&nonce_key, &true);
        Ok(())
    }

    fn pull_payment(env: &Env, subscriber: &Address, amount: i128) -> Result<(), LedgerError> {
        let token_addr: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Token)
            .ok_or(LedgerError::NotInitialized)?;
        let contract_addr = env.current_contract_address();
        token::Client::new(env, &token_addr).transfer(subscriber, &contract_addr, &amount);
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), LedgerError> {
        caller.require_auth();
        let admin: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Admin)
            .ok_or(LedgerError::NotInitialized)?;
        if *caller != admin {
            return Err(LedgerError::NotAuthorized);
        }
        Ok(())
    }
}
