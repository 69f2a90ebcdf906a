//! # Position Ledger
//!
//! The ledger owns every financial fact about an envelope: principal,
//! vault shares, unlock time, and lifecycle status. Ids are allocated by a
//! monotonic counter and never reused. Burning is a logical delete: the
//! record stays as a tombstone for audit, but every public query treats a
//! burned position as not found so stale reads cannot leak through.
//!
//! The ledger knows nothing about owners (see [`super::ownership`]) and
//! nothing about the vault's live exchange rate (growth is observed only
//! through the gateway, never stored here).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The deposit amount must be strictly positive.
    #[error("invalid amount: principal must be greater than zero")]
    InvalidAmount,

    /// The unlock time must lie strictly in the future at mint time.
    #[error("invalid unlock time: {unlock_at} is not after {now}")]
    InvalidUnlockTime {
        /// The rejected unlock timestamp.
        unlock_at: DateTime<Utc>,
        /// The clock reading the validation ran against.
        now: DateTime<Utc>,
    },

    /// No active position exists under this id. Burned positions report
    /// this same error on the public query path.
    #[error("position not found: {0}")]
    PositionNotFound(EnvelopeId),

    /// The position was already burned; the transition is one-way.
    #[error("position {0} is already burned")]
    AlreadyBurned(EnvelopeId),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Unique identifier for an envelope, assigned by the ledger at mint time.
/// Monotonic, starting at 0, never reused.
pub type EnvelopeId = u64;

/// Lifecycle status of a position.
///
/// The transition is strictly one-way: `Active -> Burned`, exactly once.
/// There is no resurrection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Minted and redeemable once the unlock time passes.
    Active,
    /// Redeemed and destroyed. Terminal; the record survives only as an
    /// audit tombstone.
    Burned,
}

impl PositionStatus {
    /// Returns `true` if this is the terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PositionStatus::Burned)
    }
}

impl std::fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PositionStatus::Active => write!(f, "Active"),
            PositionStatus::Burned => write!(f, "Burned"),
        }
    }
}

/// A single minted envelope position.
///
/// `principal`, `shares`, and `unlock_at` are fixed at mint and never
/// mutated. The only field that ever changes is `status`, once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// Unique envelope identifier.
    pub id: EnvelopeId,
    /// Base-asset quantity deposited, in smallest units. Always > 0.
    pub principal: u64,
    /// Vault shares credited for the deposit. The live redeemable value is
    /// `gateway.value_of(shares)`, never a stored number.
    pub shares: u64,
    /// Earliest time at which the position may be burned.
    pub unlock_at: DateTime<Utc>,
    /// When the position was minted.
    pub minted_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: PositionStatus,
}

impl Position {
    /// Returns `true` if the position may be burned at `now`.
    pub fn is_unlocked(&self, now: DateTime<Utc>) -> bool {
        now >= self.unlock_at
    }
}

// ---------------------------------------------------------------------------
// PositionLedger
// ---------------------------------------------------------------------------

/// The store of all positions, keyed by envelope id.
///
/// All mutation goes through this narrow interface; there is no ambient
/// state anywhere else. Serializable so the node can snapshot it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionLedger {
    /// All positions ever minted, tombstones included.
    positions: HashMap<EnvelopeId, Position>,
    /// Next id to allocate. Only ever increments.
    next_id: EnvelopeId,
}

impl PositionLedger {
    /// Creates an empty ledger. The first minted envelope gets id 0.
    pub fn new() -> Self {
        Self {
            positions: HashMap::new(),
            next_id: 0,
        }
    }

    /// Records a new active position and returns its freshly allocated id.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidAmount`] if `principal` is zero.
    /// Returns [`LedgerError::InvalidUnlockTime`] if `unlock_at <= now`.
    pub fn create(
        &mut self,
        principal: u64,
        shares: u64,
        unlock_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<EnvelopeId, LedgerError> {
        if principal == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if unlock_at <= now {
            return Err(LedgerError::InvalidUnlockTime { unlock_at, now });
        }

        let id = self.next_id;
        self.next_id += 1;

        self.positions.insert(
            id,
            Position {
                id,
                principal,
                shares,
                unlock_at,
                minted_at: now,
                status: PositionStatus::Active,
            },
        );

        Ok(id)
    }

    /// Returns the active position under `id`.
    ///
    /// Burned positions are logically deleted: they report
    /// [`LedgerError::PositionNotFound`] here exactly like an id that was
    /// never minted. Use [`audit_record`](Self::audit_record) for forensic
    /// access to tombstones.
    pub fn get(&self, id: EnvelopeId) -> Result<&Position, LedgerError> {
        match self.positions.get(&id) {
            Some(p) if p.status == PositionStatus::Active => Ok(p),
            _ => Err(LedgerError::PositionNotFound(id)),
        }
    }

    /// Flips an active position to `Burned`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::PositionNotFound`] if the id was never minted.
    /// Returns [`LedgerError::AlreadyBurned`] if the transition already
    /// happened; there is no double burn.
    pub fn mark_burned(&mut self, id: EnvelopeId) -> Result<(), LedgerError> {
        let position = self
            .positions
            .get_mut(&id)
            .ok_or(LedgerError::PositionNotFound(id))?;

        if position.status == PositionStatus::Burned {
            return Err(LedgerError::AlreadyBurned(id));
        }

        position.status = PositionStatus::Burned;
        Ok(())
    }

    /// Returns the raw record under `id`, tombstones included.
    ///
    /// Audit use only. Public query paths must go through
    /// [`get`](Self::get).
    pub fn audit_record(&self, id: EnvelopeId) -> Option<&Position> {
        self.positions.get(&id)
    }

    /// Sum of vault shares held by all active positions, saturating at
    /// `u64::MAX`.
    pub fn total_active_shares(&self) -> u64 {
        let total: u128 = self
            .positions
            .values()
            .filter(|p| p.status == PositionStatus::Active)
            .map(|p| p.shares as u128)
            .sum();
        total.min(u64::MAX as u128) as u64
    }

    /// Number of currently active positions.
    pub fn active_count(&self) -> usize {
        self.positions
            .values()
            .filter(|p| p.status == PositionStatus::Active)
            .count()
    }

    /// Total number of envelopes ever minted, burned ones included.
    pub fn total_minted(&self) -> u64 {
        self.next_id
    }
}

impl Default for PositionLedger {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn create_allocates_monotonic_ids_from_zero() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let unlock = now + Duration::days(30);

        let a = ledger.create(1_000, 1_000, unlock, now).unwrap();
        let b = ledger.create(2_000, 2_000, unlock, now).unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(ledger.total_minted(), 2);
        assert_eq!(ledger.active_count(), 2);
    }

    #[test]
    fn create_zero_principal_rejected() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let result = ledger.create(0, 100, now + Duration::days(1), now);
        assert!(matches!(result, Err(LedgerError::InvalidAmount)));
        assert_eq!(ledger.total_minted(), 0);
    }

    #[test]
    fn create_past_unlock_rejected() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let result = ledger.create(1_000, 100, now - Duration::seconds(1), now);
        assert!(matches!(result, Err(LedgerError::InvalidUnlockTime { .. })));
    }

    #[test]
    fn create_unlock_equal_to_now_rejected() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let result = ledger.create(1_000, 100, now, now);
        assert!(matches!(result, Err(LedgerError::InvalidUnlockTime { .. })));
    }

    #[test]
    fn get_returns_stored_fields() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let unlock = now + Duration::days(171);
        let id = ledger.create(1_000, 990, unlock, now).unwrap();

        let p = ledger.get(id).unwrap();
        assert_eq!(p.principal, 1_000);
        assert_eq!(p.shares, 990);
        assert_eq!(p.unlock_at, unlock);
        assert_eq!(p.minted_at, now);
        assert_eq!(p.status, PositionStatus::Active);
    }

    #[test]
    fn get_unknown_id_not_found() {
        let ledger = PositionLedger::new();
        assert!(matches!(
            ledger.get(42),
            Err(LedgerError::PositionNotFound(42))
        ));
    }

    #[test]
    fn total_active_shares_excludes_tombstones() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let unlock = now + Duration::days(1);

        let a = ledger.create(1_000, 700, unlock, now).unwrap();
        ledger.create(1_000, 300, unlock, now).unwrap();
        assert_eq!(ledger.total_active_shares(), 1_000);

        ledger.mark_burned(a).unwrap();
        assert_eq!(ledger.total_active_shares(), 300);
    }

    #[test]
    fn burned_position_reads_as_not_found() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let id = ledger.create(1_000, 1_000, now + Duration::days(1), now).unwrap();

        ledger.mark_burned(id).unwrap();

        assert!(matches!(
            ledger.get(id),
            Err(LedgerError::PositionNotFound(_))
        ));
        assert_eq!(ledger.active_count(), 0);
    }

    #[test]
    fn tombstone_survives_burn_for_audit() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let id = ledger.create(1_000, 1_000, now + Duration::days(1), now).unwrap();
        ledger.mark_burned(id).unwrap();

        let record = ledger.audit_record(id).expect("tombstone retained");
        assert_eq!(record.status, PositionStatus::Burned);
        assert_eq!(record.principal, 1_000);
    }

    #[test]
    fn double_burn_rejected() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let id = ledger.create(1_000, 1_000, now + Duration::days(1), now).unwrap();
        ledger.mark_burned(id).unwrap();

        assert!(matches!(
            ledger.mark_burned(id),
            Err(LedgerError::AlreadyBurned(_))
        ));
    }

    #[test]
    fn ids_are_never_reused_after_burn() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let unlock = now + Duration::days(1);

        let a = ledger.create(1_000, 1_000, unlock, now).unwrap();
        ledger.mark_burned(a).unwrap();
        let b = ledger.create(1_000, 1_000, unlock, now).unwrap();

        assert_ne!(a, b);
        assert_eq!(b, 1);
    }

    #[test]
    fn is_unlocked_boundary_is_inclusive() {
        let now = t0();
        let position = Position {
            id: 0,
            principal: 1,
            shares: 1,
            unlock_at: now,
            minted_at: now - Duration::days(1),
            status: PositionStatus::Active,
        };
        assert!(position.is_unlocked(now));
        assert!(!position.is_unlocked(now - Duration::seconds(1)));
    }

    #[test]
    fn ledger_serialization_roundtrip() {
        let mut ledger = PositionLedger::new();
        let now = t0();
        let id = ledger.create(1_000, 990, now + Duration::days(7), now).unwrap();

        let json = serde_json::to_string(&ledger).expect("serialize");
        let recovered: PositionLedger = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.total_minted(), 1);
        assert_eq!(recovered.get(id).unwrap().shares, 990);
    }
}
