//! Freightline Delivery Ledger
//!
//! Authorization-gated, append-only delivery-event ledger.
//!
//! # Architecture
//!
//! - **Append-Only Log**: Status/location updates are immutable once written
//! - **Single Writer**: One logical writer task eliminates race conditions
//! - **Scoped Authorization**: Capabilities are granted per (user, delivery)
//! - **Trusted Automation**: A bounded oracle allowlist marks verified updates

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]
//!
//! # Invariants
//!
//! - Sequence: `sequence` equals the entries ever written, never decreases
//! - Terminal absorption: a completed delivery accepts no further writes
//! - Atomicity: every operation fully applies or leaves no trace
//! - Linearizable: total ordering of all mutations per delivery

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod oracle;
pub mod query;
pub mod roles;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use query::QueryService;
pub use storage::Storage;
pub use types::{
    DeliveryId, DeliveryIntake, DeliveryRecord, DeliveryStatus, EventLogEntry, EventUpdate, Role,
    RoleSet, PayloadFingerprint, UserId,
};
