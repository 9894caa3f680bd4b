//! Share-based multi-vesting: many beneficiaries draw proportional shares
//! from one pooled token balance.
//!
//! Vesting proceeds in discrete ticks of the release interval rather than
//! continuously: a vestor with share 100, a 10-day duration and a 1-day
//! interval unlocks 10 tokens per whole elapsed day, counted from the cliff
//! (which may precede the start date, representing a pre-existing baseline).
//! Revocation snapshots the entitlement at the amount vested so far and
//! frees the unvested remainder for future vestors.

use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, Env, Symbol, Vec,
};

use crate::LedgerError;

const EVENT_VESTOR_ADDED: Symbol = symbol_short!("vestor");
const EVENT_RELEASE: Symbol = symbol_short!("release");
const EVENT_REVOKE: Symbol = symbol_short!("revoke");

/// One beneficiary's slice of the pool.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ShareVestor {
    /// Pool units vesting over time. After revocation this is the snapshot
    /// of everything ever vested (initial claimable folded in).
    pub share: i128,
    /// Cumulative amount already released to the beneficiary.
    pub released: i128,
    /// Unlocked as soon as the start date passes, independent of ticks.
    pub initial_claimable: i128,
    pub revocable: bool,
    pub revoked: bool,
}

#[contracttype]
pub enum DataKey {
    Admin,
    Token,
    /// Nothing at all is releasable before this timestamp.
    Start,
    /// Tick accrual is counted from here; may precede `Start`.
    Cliff,
    Duration,
    /// Tick granularity in seconds.
    Interval,
    /// Capacity used for vestors registered at initialization, before the
    /// pool is funded.
    Cap,
    /// Outstanding committed entitlement: grows on add, shrinks on release
    /// and on the unvested remainder of a revocation.
    Committed,
    Vestor(Address),
}

#[contract]
pub struct MultiVesting;

#[contractimpl]
impl MultiVesting {
    /// Configure the pool and register the initial vestors. Callable once.
    ///
    /// Initial vestors are committed against `cap` rather than the held
    /// balance: at genesis the pool is typically not yet funded.
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        env: Env,
        admin: Address,
        token: Address,
        start: u64,
        cliff: u64,
        duration: u64,
        interval: u64,
        cap: i128,
        vestors: Vec<(Address, i128, i128, bool)>,
    ) -> Result<(), LedgerError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(LedgerError::AlreadyInitialized);
        }
        if interval == 0 || interval > duration || cap <= 0 {
            return Err(LedgerError::InvalidAmount);
        }
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage().persistent().set(&DataKey::Token, &token);
        env.storage().persistent().set(&DataKey::Start, &start);
        env.storage().persistent().set(&DataKey::Cliff, &cliff);
        env.storage().persistent().set(&DataKey::Duration, &duration);
        env.storage().persistent().set(&DataKey::Interval, &interval);
        env.storage().persistent().set(&DataKey::Cap, &cap);

        let mut committed: i128 = 0;
        for (beneficiary, share, initial_claimable, revocable) in vestors.iter() {
            if share <= 0 || initial_claimable < 0 {
                return Err(LedgerError::InvalidAmount);
            }
            if env
                .storage()
                .persistent()
                .has(&DataKey::Vestor(beneficiary.clone()))
            {
                return Err(LedgerError::VestingExists);
            }
            committed = committed
                .checked_add(share)
                .and_then(|c| c.checked_add(initial_claimable))
                .ok_or(LedgerError::AmountOverflow)?;
            if committed > cap {
                return Err(LedgerError::InsufficientPool);
            }
            let vestor = ShareVestor {
                share,
                released: 0,
                initial_claimable,
                revocable,
                revoked: false,
            };
            env.storage()
                .persistent()
                .set(&DataKey::Vestor(beneficiary), &vestor);
        }
        env.storage().persistent().set(&DataKey::Committed, &committed);
        Ok(())
    }

    /// Register a vestor after genesis (admin only). The new entitlement is
    /// checked against the tokens the contract actually holds; committing
    /// exactly the remaining balance succeeds.
    pub fn add_vestor(
        env: Env,
        caller: Address,
        beneficiary: Address,
        share: i128,
        initial_claimable: i128,
        revocable: bool,
    ) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        if share <= 0 || initial_claimable < 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let key = DataKey::Vestor(beneficiary.clone());
        if env.storage().persistent().has(&key) {
            return Err(LedgerError::VestingExists);
        }
        let committed: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Committed)
            .unwrap_or(0);
        let committed = committed
            .checked_add(share)
            .and_then(|c| c.checked_add(initial_claimable))
            .ok_or(LedgerError::AmountOverflow)?;
        let token_addr: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Token)
            .ok_or(LedgerError::NotInitialized)?;
        let held = token::Client::new(&env, &token_addr).balance(&env.current_contract_address());
        if committed > held {
            return Err(LedgerError::InsufficientPool);
        }
        let vestor = ShareVestor {
            share,
            released: 0,
            initial_claimable,
            revocable,
            revoked: false,
        };
        env.storage().persistent().set(&key, &vestor);
        env.storage().persistent().set(&DataKey::Committed, &committed);
        env.events()
            .publish((EVENT_VESTOR_ADDED, caller), (beneficiary, share));
        Ok(())
    }

    /// Amount the beneficiary could release right now. Non-decreasing in
    /// time while active; constant once revoked.
    pub fn releasable_amount(env: Env, beneficiary: Address) -> Result<i128, LedgerError> {
        let vestor: ShareVestor = env
            .storage()
            .persistent()
            .get(&DataKey::Vestor(beneficiary))
            .ok_or(LedgerError::NoVesting)?;
        let now = env.ledger().timestamp();
        Self::releasable(&env, &vestor, now)
    }

    /// Release the caller's currently releasable amount. Returns the amount
    /// transferred; an immediate second call returns 0.
    pub fn release(env: Env, beneficiary: Address) -> Result<i128, LedgerError> {
        beneficiary.require_auth();
        let key = DataKey::Vestor(beneficiary.clone());
        let mut vestor: ShareVestor = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(LedgerError::NoVesting)?;
        let now = env.ledger().timestamp();
        let amount = Self::releasable(&env, &vestor, now)?;

        vestor.released = vestor
            .released
            .checked_add(amount)
            .ok_or(LedgerError::AmountOverflow)?;
        env.storage().persistent().set(&key, &vestor);
        let committed: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Committed)
            .unwrap_or(0);
        env.storage()
            .persistent()
            .set(&DataKey::Committed, &(committed - amount));

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
            .publish((EVENT_RELEASE, beneficiary), amount);
        Ok(amount)
    }

    /// Stop future vesting for a revocable vestor (admin only). The
    /// entitlement is snapshotted at the amount vested as of now; the
    /// unvested remainder is freed from the committed pool. Anything vested
    /// but unclaimed remains releasable, and `released` is untouched.
    pub fn revoke_vestor(
        env: Env,
        caller: Address,
        beneficiary: Address,
    ) -> Result<(), LedgerError> {
        Self::require_admin(&env, &caller)?;
        let key = DataKey::Vestor(beneficiary.clone());
        let mut vestor: ShareVestor = env
            .storage()
            .persistent()
            .get(&key)
            .ok_or(LedgerError::NoVesting)?;
        if !vestor.revocable {
            return Err(LedgerError::NotRevocable);
        }
        if vestor.revoked {
            return Err(LedgerError::AlreadyRevoked);
        }
        let now = env.ledger().timestamp();
        let vested_now = Self::vested(&env, &vestor, now)?;
        let freed = vestor.share + vestor.initial_claimable - vested_now;

        vestor.share = vested_now;
        vestor.initial_claimable = 0;
        vestor.revoked = true;
        env.storage().persistent().set(&key, &vestor);
        let committed: i128 = env
            .storage()
            .persistent()
            .get(&DataKey::Committed)
            .unwrap_or(0);
        env.storage()
            .persistent()
            .set(&DataKey::Committed, &(committed - freed));
        env.events()
            .publish((EVENT_REVOKE, caller), (beneficiary, freed));
        Ok(())
    }

    pub fn get_share(env: Env, beneficiary: Address) -> Result<i128, LedgerError> {
        let vestor: ShareVestor = env
            .storage()
            .persistent()
            .get(&DataKey::Vestor(beneficiary))
            .ok_or(LedgerError::NoVesting)?;
        Ok(vestor.share)
    }

    pub fn get_vestor(env: Env, beneficiary: Address) -> Result<ShareVestor, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Vestor(beneficiary))
            .ok_or(LedgerError::NoVesting)
    }

    /// Outstanding committed entitlement across all vestors.
    pub fn get_total_vested_tokens(env: Env) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Committed)
            .unwrap_or(0)
    }

    /// Total vested for a vestor at `now`: the initial claimable plus the
    /// tick-quantized fraction of the share. Whole snapshot for revoked
    /// vestors, zero before the start date.
    fn vested(env: &Env, vestor: &ShareVestor, now: u64) -> Result<i128, LedgerError> {
        if vestor.revoked {
            return Ok(vestor.share);
        }
        let start: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Start)
            .ok_or(LedgerError::NotInitialized)?;
        if now < start {
            return Ok(0);
        }
        let cliff: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Cliff)
            .ok_or(LedgerError::NotInitialized)?;
        let duration: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Duration)
            .ok_or(LedgerError::NotInitialized)?;
        let interval: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::Interval)
            .ok_or(LedgerError::NotInitialized)?;

        let ticks = if now > cliff { (now - cliff) / interval } else { 0 };
        let total_ticks = duration / interval;
        let capped = ticks.min(total_ticks);
        let from_ticks = vestor
            .share
            .checked_mul(capped as i128)
            .ok_or(LedgerError::AmountOverflow)?
            / total_ticks as i128;
        vestor
            .initial_claimable
            .checked_add(from_ticks)
            .ok_or(LedgerError::AmountOverflow)
    }

    fn releasable(env: &Env, vestor: &ShareVestor, now: u64) -> Result<i128, LedgerError> {
        Ok(Self::vested(env, vestor, now)? - vestor.released)
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
