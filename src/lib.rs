#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]

#[cfg(test)]
extern crate std;

use soroban_sdk::contracterror;

/// Centralized contract error codes, shared by all four ledgers.
/// Auth failures are signaled by host panic (`require_auth`); an invalid
/// subscription signature traps in the host (`ed25519_verify`).
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum LedgerError {
    /// Caller does not hold the required role (admin/operator).
    NotAuthorized = 1,
    /// Contract configuration is missing (initialize not called).
    NotInitialized = 2,
    /// initialize was called a second time.
    AlreadyInitialized = 3,
    /// Amount is invalid (non-positive, or inconsistent with the record).
    InvalidAmount = 4,
    /// Start date precedes the contract genesis time.
    InvalidStartDate = 5,
    /// A vesting record already exists for this beneficiary.
    VestingExists = 6,
    /// No vesting record exists for this beneficiary.
    NoVesting = 7,
    /// Claiming is not allowed before the distribution start date.
    NotStarted = 8,
    /// Linear vesting is not claimable before the beneficiary's cliff.
    CliffNotReached = 9,
    /// The record was terminated; no further releases.
    VestingTerminated = 10,
    /// The vestor was created non-revocable.
    NotRevocable = 11,
    /// The vestor was already revoked.
    AlreadyRevoked = 12,
    /// Committed entitlement would exceed the pool's capacity.
    InsufficientPool = 13,
    /// A stake already exists for this (owner, period) pair.
    DuplicatePeriod = 14,
    /// The owner has no stakes at all.
    NoStake = 15,
    /// Stake index is out of bounds.
    InvalidIndex = 16,
    /// The stake's lock period has not elapsed yet.
    LockNotElapsed = 17,
    /// The ledger's held balance cannot cover the payout.
    InsufficientBalance = 18,
    /// A subscription already exists for this caller.
    AlreadySubscribed = 19,
    /// No subscription exists for this caller.
    NoSubscription = 20,
    /// This nonce was already consumed by the subscriber.
    NonceAlreadyUsed = 21,
    /// Integer arithmetic overflowed.
    AmountOverflow = 22,
}

pub mod multi_vesting;
pub mod staking;
pub mod subscription;
pub mod vesting;

pub use multi_vesting::{MultiVesting, MultiVestingClient, ShareVestor};
pub use staking::{StakeRecord, Staking, StakingClient};
pub use subscription::{Subscription, SubscriptionClient, SubscriptionRecord};
pub use vesting::{CliffVesting, CliffVestingClient, VestingEntry, VestingRecord};

#[cfg(test)]
mod test_multi_vesting;
#[cfg(test)]
mod test_staking;
#[cfg(test)]
mod test_subscription;
#[cfg(test)]
mod test_vesting;
