//! # Envelope Lifecycle Controller
//!
//! Orchestrates the `mint` / query / `transfer` / `burn` state machine
//! across the ledger, the ownership registry, and the vault gateway.
//! Per envelope the lifecycle is `NonExistent -> Active -> Burned`, with
//! no way back from Burned.
//!
//! ## Ordering discipline
//!
//! On `burn`, every internal mutation (status flip, ownership removal) is
//! committed **before** the external `withdraw` call is issued. A vault
//! that calls back into the engine mid-withdrawal therefore observes the
//! position as already gone: a second burn on the same id fails
//! `PositionNotFound` instead of double-withdrawing. The price of that
//! guarantee is the [`EnvelopeError::WithdrawalFailed`] condition: if the
//! vault then fails the withdrawal, the position stays Burned and the
//! funds are stranded vault-side until an operator intervenes.
//!
//! Mutating operations take `&mut self`, so the borrow checker already
//! serializes top-level calls; no busy flag is needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::Clock;
use crate::gateway::{GatewayError, VaultGateway};
use crate::ledger::{EnvelopeId, LedgerError, Position, PositionLedger};
use crate::ownership::{AccountId, OwnershipError, OwnershipRegistry};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The engine-level error taxonomy. Every rejected operation maps to
/// exactly one of these; there is no silent failure and no fallback value.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// The deposit amount must be strictly positive.
    #[error("invalid amount: principal must be greater than zero")]
    InvalidAmount,

    /// The unlock time must lie strictly in the future.
    #[error("invalid unlock time: {unlock_at} is not after {now}")]
    InvalidUnlockTime {
        unlock_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// No active envelope exists under this id.
    #[error("envelope not found: {0}")]
    PositionNotFound(EnvelopeId),

    /// The id already has an owner. Indicates a sequencing bug; minting
    /// never reuses ids.
    #[error("envelope {0} already has an owner")]
    AlreadyAssigned(EnvelopeId),

    /// The burn transition already happened.
    #[error("envelope {0} is already burned")]
    AlreadyBurned(EnvelopeId),

    /// The caller does not own this envelope.
    #[error("account {caller} does not own envelope {id}")]
    NotOwner { id: EnvelopeId, caller: AccountId },

    /// The unlock time has not passed yet.
    #[error("envelope {id} is still locked until {unlock_at} (now {now})")]
    StillLocked {
        id: EnvelopeId,
        unlock_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    /// The vault refused the deposit. Recoverable: no engine state changed
    /// and the caller may retry the mint.
    #[error("vault deposit failed: {source}")]
    DepositFailed {
        #[source]
        source: GatewayError,
    },

    /// The vault could not price the shares for a live-value query.
    /// Recoverable: a pure read, no state changed.
    #[error("vault value query failed: {source}")]
    ValueQueryFailed {
        #[source]
        source: GatewayError,
    },

    /// The vault refused the withdrawal *after* the position was already
    /// marked Burned. Fatal: the position stays Burned with no owner, the
    /// disbursement never happened, and the recorded shares are stranded
    /// in the vault pending out-of-band recovery.
    #[error("vault withdrawal failed for burned envelope {id} ({shares} shares stranded): {source}")]
    WithdrawalFailed {
        id: EnvelopeId,
        shares: u64,
        #[source]
        source: GatewayError,
    },
}

impl EnvelopeError {
    /// Returns `true` for the one error that leaves funds stranded and
    /// requires operator intervention rather than a caller retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, EnvelopeError::WithdrawalFailed { .. })
    }
}

impl From<LedgerError> for EnvelopeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InvalidAmount => EnvelopeError::InvalidAmount,
            LedgerError::InvalidUnlockTime { unlock_at, now } => {
                EnvelopeError::InvalidUnlockTime { unlock_at, now }
            }
            LedgerError::PositionNotFound(id) => EnvelopeError::PositionNotFound(id),
            LedgerError::AlreadyBurned(id) => EnvelopeError::AlreadyBurned(id),
        }
    }
}

impl From<OwnershipError> for EnvelopeError {
    fn from(err: OwnershipError) -> Self {
        match err {
            OwnershipError::AlreadyAssigned(id) => EnvelopeError::AlreadyAssigned(id),
            OwnershipError::NotFound(id) => EnvelopeError::PositionNotFound(id),
            OwnershipError::NotOwner { id, caller } => EnvelopeError::NotOwner { id, caller },
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The entire durable state of the engine: the position map and the owner
/// map, nothing else. What the node persists and restores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSnapshot {
    /// All positions, tombstones included.
    pub ledger: PositionLedger,
    /// Owners of the active positions.
    pub registry: OwnershipRegistry,
}

// ---------------------------------------------------------------------------
// EnvelopeEngine
// ---------------------------------------------------------------------------

/// The lifecycle controller.
///
/// Owns the ledger and the registry outright; the vault gateway and clock
/// are injected capabilities. Generic rather than boxed so tests can reach
/// through [`gateway`](Self::gateway) into their fake vault.
#[derive(Debug)]
pub struct EnvelopeEngine<V: VaultGateway, C: Clock> {
    ledger: PositionLedger,
    registry: OwnershipRegistry,
    vault: V,
    clock: C,
}

impl<V: VaultGateway, C: Clock> EnvelopeEngine<V, C> {
    /// Creates an engine with empty state.
    pub fn new(vault: V, clock: C) -> Self {
        Self {
            ledger: PositionLedger::new(),
            registry: OwnershipRegistry::new(),
            vault,
            clock,
        }
    }

    /// Restores an engine from a previously taken snapshot.
    pub fn from_snapshot(snapshot: EngineSnapshot, vault: V, clock: C) -> Self {
        Self {
            ledger: snapshot.ledger,
            registry: snapshot.registry,
            vault,
            clock,
        }
    }

    /// Clones the durable state for persistence.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            ledger: self.ledger.clone(),
            registry: self.registry.clone(),
        }
    }

    /// Mints a new envelope for `depositor`.
    ///
    /// Validates first, then deposits into the vault, then records the
    /// position and assigns ownership. A gateway failure surfaces as
    /// [`EnvelopeError::DepositFailed`] with no ledger mutation at all.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::InvalidAmount`], [`EnvelopeError::InvalidUnlockTime`],
    /// [`EnvelopeError::DepositFailed`].
    pub fn mint(
        &mut self,
        depositor: &str,
        amount: u64,
        unlock_at: DateTime<Utc>,
    ) -> Result<EnvelopeId, EnvelopeError> {
        let now = self.clock.now();

        // All validation happens before the external call so a rejected
        // mint provably touched nothing.
        if amount == 0 {
            return Err(EnvelopeError::InvalidAmount);
        }
        if unlock_at <= now {
            return Err(EnvelopeError::InvalidUnlockTime { unlock_at, now });
        }

        let shares = self
            .vault
            .deposit(amount)
            .map_err(|source| EnvelopeError::DepositFailed { source })?;

        let id = self.ledger.create(amount, shares, unlock_at, now)?;
        self.registry.assign(id, depositor.to_string())?;

        tracing::info!(
            id,
            depositor,
            amount,
            shares,
            unlock_at = %unlock_at,
            "envelope minted"
        );
        Ok(id)
    }

    /// The principal originally deposited into envelope `id`.
    pub fn original_amount(&self, id: EnvelopeId) -> Result<u64, EnvelopeError> {
        Ok(self.ledger.get(id)?.principal)
    }

    /// The unlock time of envelope `id`.
    pub fn unlock_timestamp(&self, id: EnvelopeId) -> Result<DateTime<Utc>, EnvelopeError> {
        Ok(self.ledger.get(id)?.unlock_at)
    }

    /// The live redeemable value of envelope `id`, priced by the vault at
    /// this instant. Never cached, never assumed monotonic.
    pub fn current_value(&self, id: EnvelopeId) -> Result<u64, EnvelopeError> {
        let position = self.ledger.get(id)?;
        self.vault
            .value_of(position.shares)
            .map_err(|source| EnvelopeError::ValueQueryFailed { source })
    }

    /// Live redeemable value across all active envelopes, at the vault's
    /// current rate.
    pub fn total_locked_value(&self) -> Result<u64, EnvelopeError> {
        self.vault
            .value_of(self.ledger.total_active_shares())
            .map_err(|source| EnvelopeError::ValueQueryFailed { source })
    }

    /// The current owner of envelope `id`.
    pub fn owner_of(&self, id: EnvelopeId) -> Result<AccountId, EnvelopeError> {
        // The ledger is the source of truth for existence; a tombstoned
        // position must read not-found even if a stale owner record
        // somehow survived.
        self.ledger.get(id)?;
        Ok(self.registry.owner_of(id)?.clone())
    }

    /// Ids of every active envelope owned by `owner`, ascending.
    pub fn envelopes_of(&self, owner: &str) -> Vec<EnvelopeId> {
        self.registry.holdings(owner)
    }

    /// Reassigns ownership of `id` from `from` to `to`. No financial
    /// effect: principal, shares, and unlock time are untouched.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::PositionNotFound`], [`EnvelopeError::NotOwner`].
    pub fn transfer(
        &mut self,
        id: EnvelopeId,
        from: &str,
        to: &str,
    ) -> Result<(), EnvelopeError> {
        self.ledger.get(id)?;
        self.registry.transfer(id, from, to.to_string())?;
        tracing::info!(id, from, to, "envelope transferred");
        Ok(())
    }

    /// Burns envelope `id`, redeeming its shares and returning the
    /// disbursed amount owed to `caller`.
    ///
    /// The ledger and registry are mutated before the vault is called; see
    /// the module docs for why. The disbursed amount is whatever the vault
    /// authoritatively returns for the recorded shares, yield or not.
    ///
    /// # Errors
    ///
    /// [`EnvelopeError::PositionNotFound`], [`EnvelopeError::NotOwner`],
    /// [`EnvelopeError::StillLocked`], and the fatal
    /// [`EnvelopeError::WithdrawalFailed`].
    pub fn burn(&mut self, id: EnvelopeId, caller: &str) -> Result<u64, EnvelopeError> {
        let now = self.clock.now();

        // Checks. All of them, before anything moves.
        let position = self.ledger.get(id)?;
        let owner = self.registry.owner_of(id)?;
        if owner != caller {
            return Err(EnvelopeError::NotOwner {
                id,
                caller: caller.to_string(),
            });
        }
        if !position.is_unlocked(now) {
            return Err(EnvelopeError::StillLocked {
                id,
                unlock_at: position.unlock_at,
                now,
            });
        }
        let shares = position.shares;
        let principal = position.principal;

        // Effects. Committed before the external call so a reentrant
        // vault sees the position as already gone.
        self.ledger.mark_burned(id)?;
        self.registry.remove(id)?;

        // Interaction.
        let disbursed = match self.vault.withdraw(shares) {
            Ok(amount) => amount,
            Err(source) => {
                tracing::error!(
                    id,
                    shares,
                    %source,
                    "withdrawal failed after burn; funds stranded in vault, \
                     manual recovery required"
                );
                return Err(EnvelopeError::WithdrawalFailed { id, shares, source });
            }
        };

        tracing::info!(id, caller, principal, disbursed, "envelope burned");
        Ok(disbursed)
    }

    /// Audit access to a position record, tombstones included. Not a
    /// public query path; burned envelopes stay not-found everywhere else.
    pub fn audit_record(&self, id: EnvelopeId) -> Option<&Position> {
        self.ledger.audit_record(id)
    }

    /// Number of currently active envelopes.
    pub fn active_count(&self) -> usize {
        self.ledger.active_count()
    }

    /// Total envelopes ever minted, burned ones included.
    pub fn total_minted(&self) -> u64 {
        self.ledger.total_minted()
    }

    /// The injected vault, for callers that need gateway-side reads
    /// (tests, the node's status endpoint).
    pub fn gateway(&self) -> &V {
        &self.vault
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
