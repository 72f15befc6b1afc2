//! Global allowlist of trusted automated-update identities
//!
//! Oracles are delivery-independent: membership lets a caller log events
//! on any open delivery, and entries written that way are stamped
//! `oracle_verified`. The list is bounded and owner-mutable only.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{UserId, MAX_ORACLES},
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Bounded allowlist of trusted automated updaters
pub struct OracleRegistry {
    storage: Arc<Storage>,
    owner: UserId,
    oracles: RwLock<Vec<UserId>>,
}

impl OracleRegistry {
    /// Load the allowlist from storage
    pub fn load(storage: Arc<Storage>, owner: UserId) -> Result<Self> {
        let oracles = storage.get_oracles()?;
        Ok(Self {
            storage,
            owner,
            oracles: RwLock::new(oracles),
        })
    }

    /// Membership test
    pub fn is_oracle(&self, identity: &UserId) -> bool {
        self.oracles.read().contains(identity)
    }

    /// Snapshot of the allowlist
    pub fn oracles(&self) -> Vec<UserId> {
        self.oracles.read().clone()
    }

    /// Append an identity. Owner-only; no duplicate check, each entry
    /// counts against the capacity bound.
    pub fn add_oracle(&self, caller: &UserId, identity: UserId) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the ledger owner",
                caller
            )));
        }

        let mut oracles = self.oracles.write();
        if oracles.len() >= MAX_ORACLES {
            return Err(Error::OracleCapacityExceeded);
        }

        let mut next = oracles.clone();
        next.push(identity.clone());
        self.storage.put_oracles(&next)?;
        *oracles = next;

        tracing::info!(oracle = %identity, "Oracle registered");
        Ok(())
    }

    /// Remove one occurrence of an identity. Owner-only; removing an
    /// absent identity is a no-op success.
    pub fn remove_oracle(&self, caller: &UserId, identity: &UserId) -> Result<()> {
        if *caller != self.owner {
            return Err(Error::Unauthorized(format!(
                "{} is not the ledger owner",
                caller
            )));
        }

        let mut oracles = self.oracles.write();
        let Some(idx) = oracles.iter().position(|o| o == identity) else {
            return Ok(());
        };

        let mut next = oracles.clone();
        next.remove(idx);
        self.storage.put_oracles(&next)?;
        *oracles = next;

        tracing::info!(oracle = %identity, "Oracle removed");
        Ok(())
    }
}
