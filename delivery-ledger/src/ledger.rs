//! Main ledger orchestration layer
//!
//! This module ties together storage, authorization, and actor components
//! into a high-level API for delivery event processing.
//!
//! # Example
//!
//! ```no_run
//! use delivery_ledger::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> delivery_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config).await?;
//!
//!     // Create a delivery
//!     // let intake = ...;
//!     // ledger.initialize_delivery(caller, intake).await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle},
    admin::AdminControl,
    clock::LogicalClock,
    metrics::Metrics,
    oracle::OracleRegistry,
    query::QueryService,
    roles::RoleRegistry,
    storage::StorageStats,
    types::{DeliveryId, DeliveryIntake, EventUpdate, Role, UserId},
    Config, Result, Storage,
};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for delivery mutations
    handle: LedgerHandle,

    /// Actor task, awaited on shutdown so storage is fully released
    actor: JoinHandle<()>,

    /// Direct storage access (for reads and stats)
    storage: Arc<Storage>,

    /// Read-only query surface
    query: QueryService,

    /// Role registry
    roles: Arc<RoleRegistry>,

    /// Oracle allowlist
    oracles: Arc<OracleRegistry>,

    /// Owner identity and pause flag
    admin: Arc<AdminControl>,

    /// Metrics collector
    metrics: Metrics,
}

impl Ledger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        // Open storage
        let storage = Arc::new(Storage::open(&config)?);

        // Bootstrap control state; a stored owner survives reconfiguration
        let configured_owner = UserId::new(config.owner.clone());
        let admin = Arc::new(AdminControl::bootstrap(storage.clone(), &configured_owner)?);
        let owner = admin.owner();

        let oracles = Arc::new(OracleRegistry::load(storage.clone(), owner.clone())?);
        let roles = Arc::new(RoleRegistry::new(storage.clone(), owner));

        let clock = LogicalClock::load(&storage)?;
        let metrics = Metrics::new()
            .map_err(|e| crate::Error::Config(format!("Failed to create metrics: {}", e)))?;

        // Spawn the single-writer actor
        let (handle, actor) = spawn_ledger_actor(
            storage.clone(),
            roles.clone(),
            oracles.clone(),
            admin.clone(),
            clock,
            metrics.clone(),
        );

        let query = QueryService::new(
            storage.clone(),
            roles.clone(),
            oracles.clone(),
            admin.clone(),
        );

        Ok(Self {
            handle,
            actor,
            storage,
            query,
            roles,
            oracles,
            admin,
            metrics,
        })
    }

    // Delivery mutations (serialized through the actor)

    /// Create a delivery record together with its 4 initial role grants.
    /// The caller becomes the delivery admin. All-or-nothing.
    pub async fn initialize_delivery(&self, caller: UserId, intake: DeliveryIntake) -> Result<()> {
        self.handle.initialize_delivery(caller, intake).await
    }

    /// Append one status/location update to a delivery's event log and
    /// advance its record. Returns the new sequence number.
    pub async fn log_event(
        &self,
        caller: UserId,
        delivery_id: DeliveryId,
        update: EventUpdate,
    ) -> Result<u32> {
        self.handle.log_event(caller, delivery_id, update).await
    }

    /// Force a delivery into the failed terminal state. Operator-only;
    /// appends no event entry.
    pub async fn log_failure(
        &self,
        caller: UserId,
        delivery_id: DeliveryId,
        reason: impl Into<String>,
    ) -> Result<()> {
        self.handle
            .log_failure(caller, delivery_id, reason.into())
            .await
    }

    // Role grants (not gated by pause)

    /// Add a role to a (user, delivery) grant. Admin-role holders only.
    pub fn assign_role(
        &self,
        caller: &UserId,
        user: &UserId,
        delivery_id: DeliveryId,
        role: Role,
    ) -> Result<()> {
        self.roles.assign_role(caller, user, delivery_id, role)
    }

    /// Remove one occurrence of a role from a (user, delivery) grant.
    pub fn remove_role(
        &self,
        caller: &UserId,
        user: &UserId,
        delivery_id: DeliveryId,
        role: Role,
    ) -> Result<()> {
        self.roles.remove_role(caller, user, delivery_id, role)
    }

    // Oracle allowlist (owner-only)

    /// Append an identity to the oracle allowlist
    pub fn add_oracle(&self, caller: &UserId, identity: UserId) -> Result<()> {
        self.oracles.add_oracle(caller, identity)
    }

    /// Remove one occurrence of an identity from the oracle allowlist
    pub fn remove_oracle(&self, caller: &UserId, identity: &UserId) -> Result<()> {
        self.oracles.remove_oracle(caller, identity)
    }

    // Pause control (owner-only)

    /// Set the global pause flag
    pub fn pause(&self, caller: &UserId) -> Result<()> {
        self.admin.pause(caller)
    }

    /// Clear the global pause flag
    pub fn unpause(&self, caller: &UserId) -> Result<()> {
        self.admin.unpause(caller)
    }

    // Queries

    /// Read-only query surface
    pub fn query(&self) -> &QueryService {
        &self.query
    }

    /// Metrics collector (registry for scraping)
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Shutdown ledger, waiting for the actor to drain and release storage
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await?;
        self.actor
            .await
            .map_err(|e| crate::Error::Concurrency(format!("Actor task failed: {}", e)))?;
        Ok(())
    }
}
