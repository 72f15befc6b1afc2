//! Core types for the delivery ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Closed enumerations for statuses and roles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum event-log entries per delivery.
pub const MAX_EVENT_LOG_ENTRIES: u32 = 100;

/// Maximum roles held under one (user, delivery) grant.
pub const MAX_ROLES_PER_GRANT: usize = 5;

/// Maximum identities on the global oracle allowlist.
pub const MAX_ORACLES: usize = 10;

/// Delivery identifier (caller-supplied, unique per ledger)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DeliveryId(u64);

impl DeliveryId {
    /// Create new delivery ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get as raw integer
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque caller identity (courier account, device id, service principal, etc.)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery status lifecycle
///
/// Any non-terminal status may be followed by any other status, including
/// stage skips. Terminal statuses have no outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DeliveryStatus {
    /// Created, not yet picked up
    Pending = 1,
    /// Assigned to an operator
    Assigned = 2,
    /// Moving toward the destination
    InTransit = 3,
    /// Behind schedule
    Delayed = 4,
    /// At the destination, not yet handed over
    Arrived = 5,
    /// Handed over (terminal)
    Delivered = 6,
    /// Failed (terminal)
    Failed = 7,
    /// Cancelled (terminal)
    Cancelled = 8,
}

impl DeliveryStatus {
    /// Wire code for this status
    pub fn code(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Assigned => "assigned",
            DeliveryStatus::InTransit => "in-transit",
            DeliveryStatus::Delayed => "delayed",
            DeliveryStatus::Arrived => "arrived",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Failed => "failed",
            DeliveryStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from wire code
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeliveryStatus::Pending),
            "assigned" => Some(DeliveryStatus::Assigned),
            "in-transit" => Some(DeliveryStatus::InTransit),
            "delayed" => Some(DeliveryStatus::Delayed),
            "arrived" => Some(DeliveryStatus::Arrived),
            "delivered" => Some(DeliveryStatus::Delivered),
            "failed" => Some(DeliveryStatus::Failed),
            "cancelled" => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    /// Check if this status admits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DeliveryStatus::Delivered | DeliveryStatus::Failed | DeliveryStatus::Cancelled
        )
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Capability grantable per (user, delivery)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Role {
    /// May log events and force failures on the delivery
    Operator = 1,
    /// Marker role for automated update sources
    Oracle = 2,
    /// May mutate role grants on the delivery
    Admin = 3,
    /// Dispatching party
    Supplier = 4,
    /// Receiving party
    Recipient = 5,
}

impl Role {
    /// Wire code for this role
    pub fn code(&self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Oracle => "oracle",
            Role::Admin => "admin",
            Role::Supplier => "supplier",
            Role::Recipient => "recipient",
        }
    }

    /// Parse from wire code
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "operator" => Some(Role::Operator),
            "oracle" => Some(Role::Oracle),
            "admin" => Some(Role::Admin),
            "supplier" => Some(Role::Supplier),
            "recipient" => Some(Role::Recipient),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Bounded role grant for one (user, delivery) key
///
/// Holds at most [`MAX_ROLES_PER_GRANT`] entries. Duplicates are permitted:
/// grants are a list, not a deduplicated set, and each grant counts against
/// the capacity bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSet {
    entries: Vec<Role>,
}

impl RoleSet {
    /// Create empty grant
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Check membership
    pub fn contains(&self, role: Role) -> bool {
        self.entries.contains(&role)
    }

    /// Check if the capacity bound is reached
    pub fn is_full(&self) -> bool {
        self.entries.len() >= MAX_ROLES_PER_GRANT
    }

    /// Add a role; returns false when the grant is already full
    pub fn grant(&mut self, role: Role) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(role);
        true
    }

    /// Remove one occurrence of a role; returns false when absent
    pub fn revoke(&mut self, role: Role) -> bool {
        match self.entries.iter().position(|r| *r == role) {
            Some(idx) => {
                self.entries.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no roles are held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Held roles, in grant order
    pub fn roles(&self) -> &[Role] {
        &self.entries
    }
}

/// Fixed-size payload content hash (SHA-256), opaque to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadFingerprint([u8; 32]);

impl PayloadFingerprint {
    /// Create from an existing 32-byte digest
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the fingerprint of raw payload bytes
    pub fn digest(payload: &[u8]) -> Self {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(payload);
        Self(hasher.finalize().into())
    }

    /// Get bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PayloadFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// One tracked delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecord {
    /// Delivery ID
    pub delivery_id: DeliveryId,

    /// Current status
    pub status: DeliveryStatus,

    /// Operator identity
    pub operator: UserId,

    /// Supplier identity
    pub supplier: UserId,

    /// Recipient identity
    pub recipient: UserId,

    /// Logical time at creation
    pub start_time: u64,

    /// Caller-supplied expected arrival (logical time)
    pub expected_arrival: u64,

    /// Logical time of completion, set only when the delivery completes
    pub actual_arrival: Option<u64>,

    /// Payload content hash
    pub payload_fingerprint: PayloadFingerprint,

    /// Count of event-log entries ever written; never decreases
    pub sequence: u32,

    /// True iff status is terminal
    pub completed: bool,

    /// Free-text reason, set on forced failure; never cleared
    pub failure_reason: Option<String>,
}

impl DeliveryRecord {
    /// Check if the record is in a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// One immutable, sequence-numbered update attached to a delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Delivery this entry belongs to
    pub delivery_id: DeliveryId,

    /// Position in the delivery's log, starting at 1
    pub sequence: u32,

    /// Logical time the entry was written
    pub logical_time: u64,

    /// Reported latitude (non-empty)
    pub latitude: String,

    /// Reported longitude (non-empty)
    pub longitude: String,

    /// Reported altitude
    pub altitude: u64,

    /// Status carried by this update
    pub status: DeliveryStatus,

    /// Caller that wrote the entry
    pub updated_by: UserId,

    /// Free-text note
    pub note: String,

    /// True iff the writer was on the oracle allowlist at write time
    pub oracle_verified: bool,
}

/// Global owner identity and pause flag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminState {
    /// Owner identity, fixed at first open
    pub owner: UserId,

    /// Global pause flag for delivery creation and logging
    pub paused: bool,
}

/// Inputs for creating a delivery
#[derive(Debug, Clone)]
pub struct DeliveryIntake {
    /// Caller-supplied delivery ID
    pub delivery_id: DeliveryId,

    /// Operator identity
    pub operator: UserId,

    /// Supplier identity
    pub supplier: UserId,

    /// Recipient identity
    pub recipient: UserId,

    /// Expected arrival (logical time)
    pub expected_arrival: u64,

    /// Payload content hash
    pub payload_fingerprint: PayloadFingerprint,
}

/// Inputs for one status/location update
///
/// The status arrives as a raw wire code and is validated against the
/// closed [`DeliveryStatus`] set before anything is written.
#[derive(Debug, Clone)]
pub struct EventUpdate {
    /// Reported latitude
    pub latitude: String,

    /// Reported longitude
    pub longitude: String,

    /// Reported altitude
    pub altitude: u64,

    /// Status wire code
    pub status: String,

    /// Free-text note
    pub note: String,
}
