//! Read-only projections over the ledger
//!
//! Queries never mutate and never contend with the writer: record and
//! event writes commit in one batch, so a read observes either all of an
//! operation or none of it. Lookups for absent records return `None` where
//! the operation surface promises an optional result, and `NotFound` where
//! it promises an error.

use crate::{
    admin::AdminControl,
    oracle::OracleRegistry,
    roles::RoleRegistry,
    storage::Storage,
    types::{DeliveryId, DeliveryRecord, EventLogEntry, Role, UserId},
    Error, Result,
};
use std::sync::Arc;

/// Read-only query surface
pub struct QueryService {
    storage: Arc<Storage>,
    roles: Arc<RoleRegistry>,
    oracles: Arc<OracleRegistry>,
    admin: Arc<AdminControl>,
}

impl QueryService {
    /// Create query service over shared state
    pub fn new(
        storage: Arc<Storage>,
        roles: Arc<RoleRegistry>,
        oracles: Arc<OracleRegistry>,
        admin: Arc<AdminControl>,
    ) -> Self {
        Self {
            storage,
            roles,
            oracles,
            admin,
        }
    }

    /// Full delivery record, or `None` for an unknown id
    pub fn delivery_details(&self, delivery_id: DeliveryId) -> Result<Option<DeliveryRecord>> {
        self.storage.get_record(delivery_id)
    }

    /// One event-log entry, or `None` when (id, sequence) was never written
    pub fn event_log_entry(
        &self,
        delivery_id: DeliveryId,
        sequence: u32,
    ) -> Result<Option<EventLogEntry>> {
        self.storage.get_event(delivery_id, sequence)
    }

    /// Latest sequence number; `NotFound` for an unknown id
    pub fn latest_sequence(&self, delivery_id: DeliveryId) -> Result<u32> {
        let record = self
            .storage
            .get_record(delivery_id)?
            .ok_or(Error::NotFound(delivery_id))?;
        Ok(record.sequence)
    }

    /// Completion flag; `NotFound` for an unknown id
    pub fn is_delivery_completed(&self, delivery_id: DeliveryId) -> Result<bool> {
        let record = self
            .storage
            .get_record(delivery_id)?
            .ok_or(Error::NotFound(delivery_id))?;
        Ok(record.completed)
    }

    /// Snapshot of the oracle allowlist
    pub fn oracles(&self) -> Vec<UserId> {
        self.oracles.oracles()
    }

    /// Global pause flag
    pub fn is_paused(&self) -> bool {
        self.admin.is_paused()
    }

    /// Global owner identity
    pub fn owner(&self) -> UserId {
        self.admin.owner()
    }

    /// Role membership, owner bypass included; a missing grant is `false`
    pub fn has_role(&self, user: &UserId, delivery_id: DeliveryId, role: Role) -> Result<bool> {
        self.roles.has_role(user, delivery_id, role)
    }
}
