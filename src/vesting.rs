//! Cliff + linear vesting: single-recipient schedules funded from one pool.
//!
//! An administrator batch-loads per-beneficiary schedules; beneficiaries
//! claim on their own record. The initial amount unlocks at the distribution
//! start date, the remainder accrues linearly and becomes claimable once the
//! per-beneficiary cliff passes. Accrual is measured as a floor-divided
//! delta from the last successful claim, and once `start + duration` has
//! elapsed a claim pays out the exact remainder, so the cumulative total
//! lands on `total_amount` with no rounding dust.

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, Symbol, Vec,
};

use crate::LedgerError;

const EVENT_SCHEDULE: Symbol = symbol_short!("schedule");
const EVENT_CLAIM: Symbol = symbol_short!("claim");
const EVENT_TERMINATE: Symbol = symbol_short!("terminate");
const EVENT_START_DATE: Symbol = symbol_short!("startdate");

/// Per-beneficiary schedule and claim history.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct VestingRecord {
    pub beneficiary: Address,
    /// Total entitlement in the smallest token unit.
    pub total_amount: i128,
    /// Portion unlocked entirely at the start date, before any linear accrual.
    pub initial_amount: i128,
    pub initial_claimed: bool,
    pub claimed_amount: i128,
    pub last_claimed_time: u64,
    /// Cliff: linear vesting is not claimable before this timestamp.
    pub claim_start_time: u64,
    /// Seconds over which `total_amount - initial_amount` vests linearly.
    pub duration: u64,
    pub terminated: bool,
}

/// Input row for `set_schedule`. Claim bookkeeping starts zeroed.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct VestingEntry {
    pub beneficiary: Address,
    pub total_amount: i128,
    pub initial_amount: i128,
    pub claim_start_time: u64,
    pub duration: u64,
}

#[contracttype]
pub enum DataKey {
    Admin,
    /// Address of the fungible token this contract distributes.
    Token,
    /// Distribution start date (TGE). The initial amount unlocks here.
    StartDate,
    /// Ledger timestamp at initialization; start-date updates may not
    /// precede it.
    Genesis,
    Vesting(Address),
    /// Sum of all scheduled `total_amount`s.
    TotalVestingAmount,
    /// Sum of all amounts claimed so far.
    TotalClaimed,
}

#[contract]
pub struct CliffVesting;

#[contractimpl]
impl CliffVesting {
    /// Configure the contract. Callable once. `start_date` must not precede
    /// the current ledger time, which is recorded as the genesis bound for
    /// later `set_start_date` calls.
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        start_date: u64,
    ) -> Result<(), LedgerError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(LedgerError::AlreadyInitialized);
        }
        let now = env.ledger().timestamp();
        if start_date < now {
            return Err(LedgerError::InvalidStartDate);
        }
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage().persistent().set(&DataKey::Token, &token);
        env.storage().persistent().set(&DataKey::StartDate, &start_date);
        env.storage().persistent().set(&DataKey::Genesis, &now);
        env.storage()
            .persistent()
            .set(&DataKey::TotalVestingAmount, &0i128);
        env.storage().persistent().set(&DataKey::TotalClaimed, &0i128);
        Ok(())
    }

    /// Move the distribution start date (admin only). Rejected if the new
    /// date precedes the contract genesis time.
    pub fn set_start_date(env: Env, caller: Address, new_date: u64) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        let genesis: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Genesis)
            .ok_or(LedgerError::NotInitialized)?;
        if new_date < genesis {
            return Err(LedgerError::InvalidStartDate);
        }
        env.storage().persistent().set(&DataKey::StartDate, &new_date);
        env.events()
            .publish((EVENT_START_DATE, caller), new_date);
        Ok(())
    }

    /// Batch-create vesting records (admin only). All-or-nothing: every entry
    /// is validated before any record is written, so a duplicate or malformed
    /// entry rejects the whole batch.
    pub fn set_schedule(
        env: Env,
        caller: Address,
        entries: Vec<VestingEntry>,
    ) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        let mut batch_total: i128 = 0;
        for entry in entries.iter() {
            if env
                .storage()
                .persistent()
                .has(&DataKey::Vesting(entry.beneficiary.clone()))
            {
                return Err(LedgerError::VestingExists);
            }
            if entry.total_amount <= 0
                || entry.initial_amount < 0
                || entry.initial_amount > entry.total_amount
                || entry.duration == 0
            {
                return Err(LedgerError::InvalidAmount);
            }
            batch_total = batch_total
                .checked_add(entry.total_amount)
                .ok_or(LedgerError::AmountOverflow)?;
        }
        for entry in entries.iter() {
            let record = VestingRecord {
                beneficiary: entry.beneficiary.clone(),
                total_amount: entry.total_amount,
                initial_amount: entry.initial_amount,
                initial_claimed: false,
                claimed_amount: 0,
                last_claimed_time: 0,
                claim_start_time: entry.claim_start_time,
                duration: entry.duration,
                terminated: false,
            };
            env.storage()
                .persistent()
                .set(&DataKey::Vesting(entry.beneficiary.clone()), &record);
        }
        let total: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::TotalVestingAmount)
            .unwrap_or(0);
        let total = total
            .checked_add(batch_total)
            .ok_or(LedgerError::AmountOverflow)?;
        env.storage()
            .persistent()
            .set(&DataKey::TotalVestingAmount, &total);
        env.events()
            .publish((EVENT_SCHEDULE, caller), (entries.len(), batch_total));
        Ok(())
    }

    /// Claim everything currently releasable for `beneficiary`. Returns the
    /// amount transferred; claiming again with no elapsed time returns 0.
    ///
    /// Bookkeeping is committed before the token transfer, so a reentrant
    /// call observes the updated record and cannot double-claim.
    pub fn claim(env: Env, beneficiary: Address) -> Result<i128, LedgerError> {
        beneficiary.require_auth();
        let key = DataKey::Vesting(beneficiary.clone());
        let mut record: VestingRecord = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(LedgerError::NoVesting)?;
        let start_date: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::StartDate)
            .ok_or(LedgerError::NotInitialized)?;
        let now = env.ledger().timestamp();
        if now < start_date {
            return Err(LedgerError::NotStarted);
        }
        if record.terminated {
            return Err(LedgerError::VestingTerminated);
        }

        let mut amount: i128 = if record.initial_claimed {
            0
        } else {
            record.initial_amount
        };
        if now >= start_date.saturating_add(record.duration) {
            // Vesting window is over: pay the exact remainder.
            amount = record
                .total_amount
                .checked_sub(record.claimed_amount)
                .ok_or(LedgerError::AmountOverflow)?;
        } else if now >= record.claim_start_time {
            let accrue_from = record.last_claimed_time.max(start_date);
            let elapsed = now - accrue_from;
            let linear = (elapsed as i128)
                .checked_mul(record.total_amount - record.initial_amount)
                .ok_or(LedgerError::AmountOverflow)?
                / record.duration as i128;
            amount = amount
                .checked_add(linear)
                .ok_or(LedgerError::AmountOverflow)?;
        } else if amount == 0 {
            // Initial already taken and the cliff is still ahead.
            return Err(LedgerError::CliffNotReached);
        }

        record.claimed_amount = record
            .claimed_amount
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        record.last_claimed_time = now;
        record.initial_claimed = true;
        env.storage().persistent().set(&key, &record);

        let total_claimed: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::TotalClaimed)
            .unwrap_or(0);
        env.storage()
            .persistent()
            .set(&DataKey::TotalClaimed, &(total_claimed + amount));

        if amount > 0 {
            let token_addr: Address = env
                .storage()
                .persistent()
                .get(&DataKey::Token)
                .ok_or(LedgerError::NotInitialized)?;
            let contract_addr = env.current_contract_address();
            token::Client::new(&env, &token_addr).transfer(&contract_addr, &beneficiary, &amount);
        }
        env.events()
            .publish((EVENT_CLAIM, beneficiary), amount);
        Ok(amount)
    }

    /// Freeze a beneficiary's record (admin only). No further claims are
    /// possible; tokens already claimed are not clawed back.
    pub fn terminate(env: Env, caller: Address, beneficiary: Address) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        let key = DataKey::Vesting(beneficiary.clone());
        let mut record: VestingRecord = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(LedgerError::NoVesting)?;
        record.terminated = true;
        env.storage().persistent().set(&key, &record);
        env.events()
            .publish((EVENT_TERMINATE, caller), beneficiary);
        Ok(())
    }

    pub fn get_vesting(env: Env, beneficiary: Address) -> Result<VestingRecord, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Vesting(beneficiary))
            .ok_or(LedgerError::NoVesting)
    }

    pub fn get_start_date(env: Env) -> Result<u64, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::StartDate)
            .ok_or(LedgerError::NotInitialized)
    }

    pub fn get_total_vesting_amount(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::TotalVestingAmount)
            .unwrap_or(0)
    }

    pub fn get_total_claimed(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::TotalClaimed)
            .unwrap_or(0)
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
