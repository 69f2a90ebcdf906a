//! # Ownership Registry
//!
//! Tracks which account may open which envelope. Kept apart from the
//! ledger on purpose: transferring an envelope reassigns one map entry and
//! never touches principal, shares, or unlock time.
//!
//! An ownership record exists exactly while the position is Active. The
//! lifecycle controller removes it atomically with the burn.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::EnvelopeId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during ownership operations.
#[derive(Debug, Error)]
pub enum OwnershipError {
    /// Each id is assigned exactly once, at mint.
    #[error("envelope {0} already has an owner")]
    AlreadyAssigned(EnvelopeId),

    /// No ownership record exists for this id.
    #[error("no owner recorded for envelope {0}")]
    NotFound(EnvelopeId),

    /// The caller does not own this envelope.
    #[error("account {caller} does not own envelope {id}")]
    NotOwner {
        /// The envelope in question.
        id: EnvelopeId,
        /// The account that attempted the operation.
        caller: AccountId,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// An account identity. Opaque to the engine; whatever the host environment
/// uses to name depositors (an address, a public key, a user id).
pub type AccountId = String;

/// The map from envelope id to current owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnershipRegistry {
    owners: HashMap<EnvelopeId, AccountId>,
}

impl OwnershipRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            owners: HashMap::new(),
        }
    }

    /// Assigns the initial owner of a freshly minted envelope.
    ///
    /// # Errors
    ///
    /// Returns [`OwnershipError::AlreadyAssigned`] if the id already has an
    /// owner. The controller never reuses ids, so hitting this means a
    /// sequencing bug upstream.
    pub fn assign(&mut self, id: EnvelopeId, owner: AccountId) -> Result<(), OwnershipError> {
        if self.owners.contains_key(&id) {
            return Err(OwnershipError::AlreadyAssigned(id));
        }
        self.owners.insert(id, owner);
        Ok(())
    }

    /// Returns the current owner of `id`.
    pub fn owner_of(&self, id: EnvelopeId) -> Result<&AccountId, OwnershipError> {
        self.owners.get(&id).ok_or(OwnershipError::NotFound(id))
    }

    /// Reassigns ownership from `from` to `to`.
    ///
    /// A self-transfer (`from == to`) is an allowed no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`OwnershipError::NotFound`] if the id is unowned.
    /// Returns [`OwnershipError::NotOwner`] if `from` is not the current
    /// owner.
    pub fn transfer(
        &mut self,
        id: EnvelopeId,
        from: &str,
        to: AccountId,
    ) -> Result<(), OwnershipError> {
        let owner = self
            .owners
            .get_mut(&id)
            .ok_or(OwnershipError::NotFound(id))?;

        if owner.as_str() != from {
            return Err(OwnershipError::NotOwner {
                id,
                caller: from.to_string(),
            });
        }

        if owner.as_str() == to {
            return Ok(());
        }

        *owner = to;
        Ok(())
    }

    /// Removes the ownership record during a burn.
    ///
    /// Called only by the lifecycle controller, after the ledger has marked
    /// the position burned.
    pub fn remove(&mut self, id: EnvelopeId) -> Result<AccountId, OwnershipError> {
        self.owners.remove(&id).ok_or(OwnershipError::NotFound(id))
    }

    /// Returns the ids of every envelope currently owned by `owner`,
    /// in ascending order.
    pub fn holdings(&self, owner: &str) -> Vec<EnvelopeId> {
        let mut ids: Vec<EnvelopeId> = self
            .owners
            .iter()
            .filter(|(_, o)| o.as_str() == owner)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of ownership records, i.e. the number of active envelopes.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// Returns `true` if no envelope is currently owned.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

impl Default for OwnershipRegistry {
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

    #[test]
    fn assign_then_owner_of() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        assert_eq!(registry.owner_of(0).unwrap(), "alice");
    }

    #[test]
    fn double_assign_rejected() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        let result = registry.assign(0, "bob".into());
        assert!(matches!(result, Err(OwnershipError::AlreadyAssigned(0))));
        // Original owner is untouched.
        assert_eq!(registry.owner_of(0).unwrap(), "alice");
    }

    #[test]
    fn owner_of_unknown_id_not_found() {
        let registry = OwnershipRegistry::new();
        assert!(matches!(
            registry.owner_of(7),
            Err(OwnershipError::NotFound(7))
        ));
    }

    #[test]
    fn transfer_reassigns_owner() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        registry.transfer(0, "alice", "bob".into()).unwrap();
        assert_eq!(registry.owner_of(0).unwrap(), "bob");
    }

    #[test]
    fn transfer_by_non_owner_rejected() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        let result = registry.transfer(0, "mallory", "mallory".into());
        assert!(matches!(result, Err(OwnershipError::NotOwner { .. })));
        assert_eq!(registry.owner_of(0).unwrap(), "alice");
    }

    #[test]
    fn self_transfer_is_a_noop_not_an_error() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        registry.transfer(0, "alice", "alice".into()).unwrap();
        assert_eq!(registry.owner_of(0).unwrap(), "alice");
    }

    #[test]
    fn remove_clears_record() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        let removed = registry.remove(0).unwrap();
        assert_eq!(removed, "alice");
        assert!(matches!(
            registry.owner_of(0),
            Err(OwnershipError::NotFound(0))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn remove_unknown_id_not_found() {
        let mut registry = OwnershipRegistry::new();
        assert!(matches!(registry.remove(0), Err(OwnershipError::NotFound(0))));
    }

    #[test]
    fn holdings_lists_owned_ids_sorted() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(2, "alice".into()).unwrap();
        registry.assign(0, "alice".into()).unwrap();
        registry.assign(1, "bob".into()).unwrap();

        assert_eq!(registry.holdings("alice"), vec![0, 2]);
        assert_eq!(registry.holdings("bob"), vec![1]);
        assert!(registry.holdings("carol").is_empty());
    }

    #[test]
    fn registry_serialization_roundtrip() {
        let mut registry = OwnershipRegistry::new();
        registry.assign(0, "alice".into()).unwrap();
        registry.assign(1, "bob".into()).unwrap();

        let json = serde_json::to_string(&registry).expect("serialize");
        let recovered: OwnershipRegistry = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.owner_of(0).unwrap(), "alice");
        assert_eq!(recovered.len(), 2);
    }
}
