//! Global owner identity and pause flag
//!
//! The owner is fixed when a fresh database is first opened and is
//! write-once from then on. The pause flag gates delivery creation and
//! event logging; role-grant mutations are deliberately not gated.

use crate::{
    error::{Error, Result},
    storage::Storage,
    types::{AdminState, UserId},
};
use parking_lot::RwLock;
use std::sync::Arc;

/// Owner identity and global pause flag
pub struct AdminControl {
    storage: Arc<Storage>,
    state: RwLock<AdminState>,
}

impl AdminControl {
    /// Load the admin state, seeding the owner from configuration on a
    /// fresh database. An already-stored owner always wins.
    pub fn bootstrap(storage: Arc<Storage>, configured_owner: &UserId) -> Result<Self> {
        let state = match storage.get_admin_state()? {
            Some(state) => {
                if state.owner != *configured_owner {
                    tracing::warn!(
                        stored = %state.owner,
                        configured = %configured_owner,
                        "Configured owner differs from stored owner; keeping stored"
                    );
                }
                state
            }
            None => {
                let state = AdminState {
                    owner: configured_owner.clone(),
                    paused: false,
                };
                storage.put_admin_state(&state)?;
                tracing::info!(owner = %state.owner, "Ledger owner initialized");
                state
            }
        };

        Ok(Self {
            storage,
            state: RwLock::new(state),
        })
    }

    /// Owner identity
    pub fn owner(&self) -> UserId {
        self.state.read().owner.clone()
    }

    /// Check if a user is the global owner
    pub fn is_owner(&self, user: &UserId) -> bool {
        self.state.read().owner == *user
    }

    /// Check the global pause flag
    pub fn is_paused(&self) -> bool {
        self.state.read().paused
    }

    /// Set the pause flag. Owner-only; stays available while paused.
    pub fn pause(&self, caller: &UserId) -> Result<()> {
        self.set_paused(caller, true)
    }

    /// Clear the pause flag. Owner-only.
    pub fn unpause(&self, caller: &UserId) -> Result<()> {
        self.set_paused(caller, false)
    }

    fn set_paused(&self, caller: &UserId, paused: bool) -> Result<()> {
        let mut state = self.state.write();
        if state.owner != *caller {
            return Err(Error::Unauthorized(format!(
                "{} is not the ledger owner",
                caller
            )));
        }

        let next = AdminState {
            owner: state.owner.clone(),
            paused,
        };
        self.storage.put_admin_state(&next)?;
        *state = next;

        tracing::info!(paused, "Pause flag updated");
        Ok(())
    }
}
