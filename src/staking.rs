//! Lock-period staking: an operator books time-locked deposits on behalf of
//! beneficiaries, one per billing period, and owners withdraw them with a
//! fixed yield bonus once the lock elapses.
//!
//! The operator role is distinct from the admin: the operator may only
//! create stakes, the admin manages the role and can sweep the held balance.

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, String, Symbol, Vec,
};

use crate::LedgerError;

const EVENT_STAKE: Symbol = symbol_short!("stake");
const EVENT_UNSTAKE: Symbol = symbol_short!("unstake");
const EVENT_OPERATOR: Symbol = symbol_short!("operator");
const EVENT_WITHDRAW: Symbol = symbol_short!("withdraw");

/// Minimum time a deposit stays locked: 365 days.
pub const LOCK_PERIOD: u64 = 31_536_000;

const BPS_DENOMINATOR: i128 = 10_000;

/// One time-locked deposit.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct StakeRecord {
    pub amount: i128,
    pub owner: Address,
    /// Opaque period label, e.g. a calendar-month string like "08/2023".
    pub period_key: String,
    pub deposit_time: u64,
}

#[contracttype]
pub enum DataKey {
    Admin,
    Token,
    Operator,
    /// Yield bonus paid on unstake, in basis points of the staked amount.
    YieldBps,
    Stakes(Address),
    /// Uniqueness index: at most one active stake per (owner, period).
    Staked(Address, String),
}

#[contract]
pub struct Staking;

#[contractimpl]
impl Staking {
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        operator: Address,
        yield_bps: u32,
    ) -> Result<(), LedgerError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(LedgerError::AlreadyInitialized);
        }
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage().persistent().set(&DataKey::Token, &token);
        env.storage().persistent().set(&DataKey::Operator, &operator);
        env.storage().persistent().set(&DataKey::YieldBps, &yield_bps);
        Ok(())
    }

    /// Replace the operator (admin only).
    pub fn set_operator(env: Env, caller: Address, operator: Address) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Operator, &operator);
        env.events().publish((EVENT_OPERATOR, caller), operator);
        Ok(())
    }

    pub fn get_operator(env: Env) -> Result<Address, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Operator)
            .ok_or(LedgerError::NotInitialized)
    }

    /// Book a deposit for `beneficiary` under `period_key` (operator only).
    /// A second stake for the same (beneficiary, period) pair is rejected.
    pub fn stake(
        env: Env,
        caller: Address,
        amount: i128,
        beneficiary: Address,
        period_key: String,
    ) -> Result<(), LedgerError> {
        caller.require_auth();
        let operator: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Operator)
            .ok_or(LedgerError::NotInitialized)?;
        if caller != operator {
            return Err(LedgerError::NotAuthorized);
        }
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let period_flag = DataKey::Staked(beneficiary.clone(), period_key.clone());
        if env.storage().persistent().has(&period_flag) {
            return Err(LedgerError::DuplicatePeriod);
        }
        let list_key = DataKey::Stakes(beneficiary.clone());
        let mut stakes: Vec<StakeRecord> = env
            .storage()
            .persistent()
            .get(&list_key)
            .unwrap_or(Vec::new(&env));
        stakes.push_back(StakeRecord {
            amount,
            owner: beneficiary.clone(),
            period_key: period_key.clone(),
            deposit_time: env.ledger().timestamp(),
        });
        env.storage().persistent().set(&list_key, &stakes);
        env.storage().persistent().set(&period_flag, &true);
        env.events()
            .publish((EVENT_STAKE, beneficiary), (amount, period_key));
        Ok(())
    }

    pub fn get_stakes(env: Env, beneficiary: Address) -> Vec<StakeRecord> {
        env.storage()
            .persistent()
            .get(&DataKey::Stakes(beneficiary))
            .unwrap_or(Vec::new(&env))
    }

    /// Withdraw the stake at `index` plus its yield bonus (owner only).
    /// Only allowed once the lock period has elapsed, and only if the
    /// contract still holds enough tokens to cover the payout.
    pub fn unstake(env: Env, beneficiary: Address, index: u32) -> Result<i128, LedgerError> {
        beneficiary.require_auth();
        let list_key = DataKey::Stakes(beneficiary.clone());
        let mut stakes: Vec<StakeRecord> = env
            .storage()
            .persistent()
            .get(&list_key)
            .unwrap_or(Vec::new(&env));
        if stakes.is_empty() {
            return Err(LedgerError::NoStake);
        }
        let record = stakes.get(index).ok_or(LedgerError::InvalidIndex)?;
        let now = env.ledger().timestamp();
        if now < record.deposit_time.saturating_add(LOCK_PERIOD) {
            return Err(LedgerError::LockNotElapsed);
        }
        let yield_bps: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::YieldBps)
            .unwrap_or(0);
        let bonus = record
            .amount
            .checked_mul(yield_bps as i128)
            .ok_or(LedgerError::AmountOverflow)?
            / BPS_DENOMINATOR;
        let payout = record
            .amount
            .checked_add(bonus)
            .ok_or(LedgerError::AmountOverflow)?;

        let token_addr: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Token)
            .ok_or(LedgerError::NotInitialized)?;
        let token_client = token::Client::new(&env, &token_addr);
        let contract_addr = env.current_contract_address();
        if token_client.balance(&contract_addr) < payout {
            return Err(LedgerError::InsufficientBalance);
        }

        stakes.remove(index).ok_or(LedgerError::InvalidIndex)?;
        env.storage().persistent().set(&list_key, &stakes);
        env.storage()
            .persistent()
            .remove(&DataKey::Staked(beneficiary.clone(), record.period_key.clone()));

        token_client.transfer(&contract_addr, &beneficiary, &payout);
        env.events()
            .publish((EVENT_UNSTAKE, beneficiary), (payout, record.period_key));
        Ok(payout)
    }

    /// Emergency sweep of the entire held balance to the admin (admin only).
    /// Outstanding stakes are deliberately ignored; this is an escape hatch.
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
