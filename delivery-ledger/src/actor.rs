//! Actor-based concurrency for delivery mutations
//!
//! This module implements the single-writer pattern using Tokio actors:
//! every delivery mutation (create, log event, force failure) runs its
//! whole read-validate-mutate sequence inside one actor task, so two
//! callers can never both pass the `completed` check and both write.
//! Reads go straight to storage; multi-key writes commit in one RocksDB
//! batch, so a read observes either all of an operation or none of it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               LedgerHandle (Clone)                    │
//! │         Sends commands to actor mailbox              │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       │ mpsc::channel (bounded)
//!                       ▼
//! ┌──────────────────────────────────────────────────────┐
//! │              LedgerActor (Single Task)                │
//! │   check pause / roles / status → WriteBatch commit   │
//! └─────────────────────┬────────────────────────────────┘
//!                       │
//!                       ▼
//!              Storage (RocksDB, atomic)
//! ```

use crate::{
    admin::AdminControl,
    clock::LogicalClock,
    metrics::Metrics,
    oracle::OracleRegistry,
    roles::RoleRegistry,
    types::{
        DeliveryId, DeliveryIntake, DeliveryRecord, DeliveryStatus, EventLogEntry, EventUpdate,
        Role, RoleSet, UserId, MAX_EVENT_LOG_ENTRIES,
    },
    Error, Result, Storage,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Command sent to the ledger actor
pub enum LedgerCommand {
    /// Create a delivery record with its initial role grants
    InitializeDelivery {
        /// Caller identity (becomes the delivery admin)
        caller: UserId,
        /// Creation inputs
        intake: DeliveryIntake,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Append a status/location update to a delivery
    LogEvent {
        /// Caller identity
        caller: UserId,
        /// Target delivery
        delivery_id: DeliveryId,
        /// Update inputs
        update: EventUpdate,
        /// Response channel, carries the new sequence number
        response: oneshot::Sender<Result<u32>>,
    },

    /// Force a delivery into the failed terminal state
    LogFailure {
        /// Caller identity
        caller: UserId,
        /// Target delivery
        delivery_id: DeliveryId,
        /// Free-text failure reason
        reason: String,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes delivery mutations
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Role registry for authorization
    roles: Arc<RoleRegistry>,

    /// Oracle allowlist
    oracles: Arc<OracleRegistry>,

    /// Owner identity and pause flag
    admin: Arc<AdminControl>,

    /// Logical clock; ticks commit with the mutation they stamp
    clock: LogicalClock,

    /// Metrics collector
    metrics: Metrics,

    /// Mailbox for incoming commands
    mailbox: mpsc::Receiver<LedgerCommand>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        roles: Arc<RoleRegistry>,
        oracles: Arc<OracleRegistry>,
        admin: Arc<AdminControl>,
        clock: LogicalClock,
        metrics: Metrics,
        mailbox: mpsc::Receiver<LedgerCommand>,
    ) -> Self {
        Self {
            storage,
            roles,
            oracles,
            admin,
            clock,
            metrics,
            mailbox,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(cmd) = self.mailbox.recv().await {
            match cmd {
                LedgerCommand::Shutdown => break,

                LedgerCommand::InitializeDelivery {
                    caller,
                    intake,
                    response,
                } => {
                    let result = self.initialize_delivery(&caller, intake);
                    let _ = response.send(result);
                }

                LedgerCommand::LogEvent {
                    caller,
                    delivery_id,
                    update,
                    response,
                } => {
                    let started = Instant::now();
                    let result = self.log_event(&caller, delivery_id, update);
                    self.metrics
                        .record_append_duration(started.elapsed().as_secs_f64());
                    let _ = response.send(result);
                }

                LedgerCommand::LogFailure {
                    caller,
                    delivery_id,
                    reason,
                    response,
                } => {
                    let result = self.log_failure(&caller, delivery_id, reason);
                    let _ = response.send(result);
                }
            }
        }
    }

    /// Create a delivery record and its 4 initial role grants atomically.
    fn initialize_delivery(&mut self, caller: &UserId, intake: DeliveryIntake) -> Result<()> {
        if self.storage.get_record(intake.delivery_id)?.is_some() {
            return Err(Error::AlreadyInitialized(intake.delivery_id));
        }

        if self.admin.is_paused() {
            return Err(Error::Paused);
        }

        let start_time = self.clock.tick();
        let record = DeliveryRecord {
            delivery_id: intake.delivery_id,
            status: DeliveryStatus::Pending,
            operator: intake.operator.clone(),
            supplier: intake.supplier.clone(),
            recipient: intake.recipient.clone(),
            start_time,
            expected_arrival: intake.expected_arrival,
            actual_arrival: None,
            payload_fingerprint: intake.payload_fingerprint,
            sequence: 0,
            completed: false,
            failure_reason: None,
        };

        // Initial grants: creator gets Admin, the three parties get their
        // own roles. Grants to the same identity merge into one keyed set.
        let initial = [
            (caller.clone(), Role::Admin),
            (intake.operator, Role::Operator),
            (intake.supplier, Role::Supplier),
            (intake.recipient, Role::Recipient),
        ];
        let mut grants: Vec<(UserId, RoleSet)> = Vec::with_capacity(initial.len());
        for (user, role) in initial {
            match grants.iter_mut().find(|(u, _)| *u == user) {
                Some((_, set)) => {
                    set.grant(role);
                }
                None => {
                    let mut set = RoleSet::new();
                    set.grant(role);
                    grants.push((user, set));
                }
            }
        }

        self.storage
            .create_delivery_atomic(&record, &grants, self.clock.now())?;

        self.metrics.record_delivery_created();
        tracing::info!(
            delivery_id = %record.delivery_id,
            operator = %record.operator,
            start_time,
            "Delivery initialized"
        );
        Ok(())
    }

    /// Append one update to the event log and advance the record. Every
    /// check completes before any write; the entry, the record update and
    /// the clock commit in one batch.
    fn log_event(
        &mut self,
        caller: &UserId,
        delivery_id: DeliveryId,
        update: EventUpdate,
    ) -> Result<u32> {
        let mut record = self
            .storage
            .get_record(delivery_id)?
            .ok_or(Error::NotFound(delivery_id))?;

        if self.admin.is_paused() {
            return Err(Error::Paused);
        }

        if record.completed {
            return Err(Error::AlreadyCompleted(delivery_id));
        }

        let oracle_verified = self.oracles.is_oracle(caller);
        if !oracle_verified && !self.roles.has_role(caller, delivery_id, Role::Operator)? {
            return Err(Error::Unauthorized(format!(
                "{} is neither an operator of delivery {} nor a registered oracle",
                caller, delivery_id
            )));
        }

        let status = DeliveryStatus::from_str(&update.status)
            .ok_or_else(|| Error::InvalidStatus(update.status.clone()))?;
        if update.latitude.is_empty() {
            return Err(Error::EmptyCoordinate("latitude"));
        }
        if update.longitude.is_empty() {
            return Err(Error::EmptyCoordinate("longitude"));
        }

        if record.sequence >= MAX_EVENT_LOG_ENTRIES {
            return Err(Error::LogLimitExceeded(delivery_id));
        }

        let logical_time = self.clock.tick();
        let sequence = record.sequence + 1;
        let entry = EventLogEntry {
            delivery_id,
            sequence,
            logical_time,
            latitude: update.latitude,
            longitude: update.longitude,
            altitude: update.altitude,
            status,
            updated_by: caller.clone(),
            note: update.note,
            oracle_verified,
        };

        record.status = status;
        record.sequence = sequence;
        if status.is_terminal() {
            record.completed = true;
            record.actual_arrival = Some(logical_time);
        }

        self.storage
            .append_event_atomic(&entry, &record, self.clock.now())?;

        self.metrics.record_event_appended();
        tracing::info!(
            %delivery_id,
            sequence,
            %status,
            updated_by = %caller,
            oracle_verified,
            "Event logged"
        );
        Ok(sequence)
    }

    /// Force the delivery into the failed terminal state. Appends no
    /// event entry and does not advance the sequence.
    fn log_failure(&mut self, caller: &UserId, delivery_id: DeliveryId, reason: String) -> Result<()> {
        let mut record = self
            .storage
            .get_record(delivery_id)?
            .ok_or(Error::NotFound(delivery_id))?;

        if self.admin.is_paused() {
            return Err(Error::Paused);
        }

        if record.completed {
            return Err(Error::AlreadyCompleted(delivery_id));
        }

        // Oracle membership does not apply here: only the explicit
        // operator role (or the owner bypass) may force a failure.
        if !self.roles.has_role(caller, delivery_id, Role::Operator)? {
            return Err(Error::Unauthorized(format!(
                "{} is not an operator of delivery {}",
                caller, delivery_id
            )));
        }

        record.status = DeliveryStatus::Failed;
        record.completed = true;
        record.failure_reason = Some(reason);

        self.storage.put_record(&record)?;

        self.metrics.record_forced_failure();
        tracing::warn!(
            %delivery_id,
            updated_by = %caller,
            "Delivery marked failed"
        );
        Ok(())
    }
}

/// Handle for sending commands to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerCommand>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerCommand>) -> Self {
        Self { sender }
    }

    /// Create a delivery record
    pub async fn initialize_delivery(&self, caller: UserId, intake: DeliveryIntake) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerCommand::InitializeDelivery {
                caller,
                intake,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Append an update, returning the new sequence number
    pub async fn log_event(
        &self,
        caller: UserId,
        delivery_id: DeliveryId,
        update: EventUpdate,
    ) -> Result<u32> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerCommand::LogEvent {
                caller,
                delivery_id,
                update,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Force a failure
    pub async fn log_failure(
        &self,
        caller: UserId,
        delivery_id: DeliveryId,
        reason: String,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(LedgerCommand::LogFailure {
                caller,
                delivery_id,
                reason,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerCommand::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor. The join handle completes once the actor has
/// stopped and released its storage reference; await it for a clean
/// shutdown before reopening the database.
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    roles: Arc<RoleRegistry>,
    oracles: Arc<OracleRegistry>,
    admin: Arc<AdminControl>,
    clock: LogicalClock,
    metrics: Metrics,
) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, roles, oracles, admin, clock, metrics, rx);

    let join = tokio::spawn(async move {
        actor.run().await;
    });

    (LedgerHandle::new(tx), join)
}
