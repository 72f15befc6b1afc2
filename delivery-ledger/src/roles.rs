//! Per-delivery role grants
//!
//! Capabilities are scoped to a (user, delivery) key. The global owner
//! passes every role check system-wide. Grant mutations require the Admin
//! role for that delivery and are serialized under one mutex; they are not
//! gated by the global pause flag.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{DeliveryId, Role, RoleSet, UserId},
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-(user, delivery) capability registry
pub struct RoleRegistry {
    storage: Arc<Storage>,
    owner: UserId,
    /// Serializes read-modify-write of grants so the capacity bound holds
    /// under concurrent callers.
    write_lock: Mutex<()>,
}

impl RoleRegistry {
    /// Create registry over storage
    pub fn new(storage: Arc<Storage>, owner: UserId) -> Self {
        Self {
            storage,
            owner,
            write_lock: Mutex::new(()),
        }
    }

    /// Check whether a user holds a role for a delivery. The global owner
    /// passes every check; otherwise the (user, delivery) grant decides.
    /// A missing grant is simply `false`, never an error.
    pub fn has_role(&self, user: &UserId, delivery_id: DeliveryId, role: Role) -> Result<bool> {
        if *user == self.owner {
            return Ok(true);
        }

        match self.storage.get_role_set(user, delivery_id)? {
            Some(set) => Ok(set.contains(role)),
            None => Ok(false),
        }
    }

    /// Add a role to the (user, delivery) grant. Caller must hold Admin
    /// for that delivery; the delivery must exist; the grant must have
    /// capacity left. Duplicates are permitted.
    pub fn assign_role(
        &self,
        caller: &UserId,
        user: &UserId,
        delivery_id: DeliveryId,
        role: Role,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();

        if !self.has_role(caller, delivery_id, Role::Admin)? {
            return Err(Error::Unauthorized(format!(
                "{} does not hold admin for delivery {}",
                caller, delivery_id
            )));
        }

        if self.storage.get_record(delivery_id)?.is_none() {
            return Err(Error::NotFound(delivery_id));
        }

        let mut set = self
            .storage
            .get_role_set(user, delivery_id)?
            .unwrap_or_default();

        if !set.grant(role) {
            return Err(Error::RoleCapacityExceeded {
                user: user.clone(),
                delivery_id,
            });
        }

        self.storage.put_role_set(user, delivery_id, &set)?;

        tracing::debug!(
            %caller,
            %user,
            %delivery_id,
            %role,
            "Role assigned"
        );
        Ok(())
    }

    /// Remove one occurrence of a role from the (user, delivery) grant.
    /// Same authorization as [`assign_role`](Self::assign_role); removing
    /// an absent role is a no-op success.
    pub fn remove_role(
        &self,
        caller: &UserId,
        user: &UserId,
        delivery_id: DeliveryId,
        role: Role,
    ) -> Result<()> {
        let _guard = self.write_lock.lock();

        if !self.has_role(caller, delivery_id, Role::Admin)? {
            return Err(Error::Unauthorized(format!(
                "{} does not hold admin for delivery {}",
                caller, delivery_id
            )));
        }

        if self.storage.get_record(delivery_id)?.is_none() {
            return Err(Error::NotFound(delivery_id));
        }

        let Some(mut set) = self.storage.get_role_set(user, delivery_id)? else {
            return Ok(());
        };

        if set.revoke(role) {
            self.storage.put_role_set(user, delivery_id, &set)?;
            tracing::debug!(
                %caller,
                %user,
                %delivery_id,
                %role,
                "Role removed"
            );
        }
        Ok(())
    }
}
