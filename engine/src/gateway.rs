//! # Vault Gateway
//!
//! The seam between the engine and the external yield-bearing vault. The
//! engine never models yield itself: it hands the vault an amount, records
//! the shares it gets back, and from then on trusts `value_of`/`withdraw`
//! as the authoritative word on what those shares are worth. Growth is
//! never assumed to be monotonic.
//!
//! [`FixedRateVault`] is the deterministic implementation used by tests
//! and the devnet node: a linear exchange index that grows at a configured
//! APY. A production deployment would implement [`VaultGateway`] as a
//! pass-through to the real vault protocol.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clock::Clock;
use crate::config::{INDEX_SCALE, SECONDS_PER_YEAR};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a vault gateway implementation.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The vault refused the operation. All-or-nothing: a rejected call
    /// leaves no partial state behind.
    #[error("vault rejected the operation: {0}")]
    Rejected(String),

    /// The vault could not be reached at all.
    #[error("vault unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// VaultGateway
// ---------------------------------------------------------------------------

/// Capability interface over the external yield service.
///
/// Implementations must be atomic per call: a returned error means nothing
/// happened on the vault side.
pub trait VaultGateway {
    /// Moves `amount` of the base asset into the vault and returns the
    /// share quantity credited for it.
    fn deposit(&mut self, amount: u64) -> Result<u64, GatewayError>;

    /// Redeems `shares` and returns the disbursed base-asset amount. The
    /// return value is authoritative; it may exceed the amount originally
    /// deposited for those shares (yield) or fall short of it (negative
    /// yield).
    fn withdraw(&mut self, shares: u64) -> Result<u64, GatewayError>;

    /// Current redemption value of `shares` at the live exchange rate.
    /// A pure read: no withdrawal is executed and no state changes.
    fn value_of(&self, shares: u64) -> Result<u64, GatewayError>;
}

// ---------------------------------------------------------------------------
// FixedRateVault
// ---------------------------------------------------------------------------

/// A deterministic vault with a linearly growing exchange index.
///
/// The index starts at [`INDEX_SCALE`] at construction time and accrues
/// simple interest at `apy_bps` basis points per [`SECONDS_PER_YEAR`].
/// Shares are priced against the index at deposit time, so an early
/// deposit earns the full accrual between deposit and withdrawal:
///
/// ```text
/// shares = amount * INDEX_SCALE / index(now)
/// value  = shares * index(now) / INDEX_SCALE
/// ```
///
/// All intermediate arithmetic is u128; amounts never touch floats.
#[derive(Debug)]
pub struct FixedRateVault<C: Clock> {
    clock: C,
    apy_bps: u32,
    genesis: DateTime<Utc>,
    total_shares: u128,
}

impl<C: Clock> FixedRateVault<C> {
    /// Creates a vault whose index starts accruing now.
    pub fn new(clock: C, apy_bps: u32) -> Self {
        let genesis = clock.now();
        Self {
            clock,
            apy_bps,
            genesis,
            total_shares: 0,
        }
    }

    /// The exchange index at `at`. Clamped to [`INDEX_SCALE`] for any
    /// instant at or before genesis.
    fn index_at(&self, at: DateTime<Utc>) -> u128 {
        let elapsed = (at - self.genesis).num_seconds();
        if elapsed <= 0 {
            return INDEX_SCALE;
        }
        let accrued = INDEX_SCALE * self.apy_bps as u128 * elapsed as u128
            / (10_000u128 * SECONDS_PER_YEAR as u128);
        INDEX_SCALE + accrued
    }

    /// The index at the current clock reading.
    pub fn current_index(&self) -> u128 {
        self.index_at(self.clock.now())
    }

    /// Total base-asset value currently held by the vault across all
    /// outstanding shares. Lets tests verify a burn drains the vault.
    pub fn total_underlying(&self) -> u64 {
        let value = self.total_shares * self.current_index() / INDEX_SCALE;
        value.min(u64::MAX as u128) as u64
    }

    /// Outstanding shares across all depositors.
    pub fn total_shares(&self) -> u64 {
        self.total_shares.min(u64::MAX as u128) as u64
    }
}

impl<C: Clock> VaultGateway for FixedRateVault<C> {
    fn deposit(&mut self, amount: u64) -> Result<u64, GatewayError> {
        if amount == 0 {
            return Err(GatewayError::Rejected("zero deposit".into()));
        }
        let index = self.current_index();
        let shares = amount as u128 * INDEX_SCALE / index;
        if shares == 0 {
            // Amount too small to be worth a single share at this index.
            return Err(GatewayError::Rejected(format!(
                "amount {} below one share at index {}",
                amount, index
            )));
        }
        self.total_shares += shares;
        Ok(shares as u64)
    }

    fn withdraw(&mut self, shares: u64) -> Result<u64, GatewayError> {
        if shares as u128 > self.total_shares {
            return Err(GatewayError::Rejected(format!(
                "insufficient shares: have {}, requested {}",
                self.total_shares, shares
            )));
        }
        let amount = shares as u128 * self.current_index() / INDEX_SCALE;
        let amount = u64::try_from(amount)
            .map_err(|_| GatewayError::Rejected("redemption overflows u64".into()))?;
        self.total_shares -= shares as u128;
        Ok(amount)
    }

    fn value_of(&self, shares: u64) -> Result<u64, GatewayError> {
        let value = shares as u128 * self.current_index() / INDEX_SCALE;
        u64::try_from(value)
            .map_err(|_| GatewayError::Rejected("valuation overflows u64".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
