//! Persisted logical clock
//!
//! Every logical-time stamp in the ledger (delivery start, event time,
//! completion time) comes from one monotonic counter. The counter is
//! committed in the same write batch as the mutation it stamps, so stored
//! timestamps never run ahead of the persisted clock. A tick that never
//! reaches storage (the operation failed after ticking) only skips values;
//! monotonicity holds across restarts.

use crate::{storage::Storage, Result};

/// Monotonic logical clock backed by the control column family
#[derive(Debug)]
pub struct LogicalClock {
    current: u64,
}

impl LogicalClock {
    /// Load the clock from storage; a fresh database starts at 0
    pub fn load(storage: &Storage) -> Result<Self> {
        let current = storage.get_clock()?;
        Ok(Self { current })
    }

    /// Advance the clock and return the new value
    pub fn tick(&mut self) -> u64 {
        self.current += 1;
        self.current
    }

    /// Current value without advancing
    pub fn now(&self) -> u64 {
        self.current
    }
}
