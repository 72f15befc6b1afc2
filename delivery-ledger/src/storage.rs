//! Storage layer using RocksDB
//!
//! # Column Families
//!
//! - `deliveries` - Delivery records (key: delivery_id)
//! - `event_log` - Append-only event entries (key: delivery_id || sequence)
//! - `roles` - Role grants (key: user || '|' || delivery_id)
//! - `control` - Singletons: admin state, oracle allowlist, logical clock

use crate::{
    error::{Error, Result},
    types::{AdminState, DeliveryId, DeliveryRecord, EventLogEntry, RoleSet, UserId},
    Config,
};
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DBCompactionStyle, Options, WriteBatch, DB};
use std::sync::Arc;

/// Column family names
const CF_DELIVERIES: &str = "deliveries";
const CF_EVENT_LOG: &str = "event_log";
const CF_ROLES: &str = "roles";
const CF_CONTROL: &str = "control";

/// Control singleton keys
const KEY_ADMIN: &[u8] = b"admin";
const KEY_ORACLES: &[u8] = b"oracles";
const KEY_CLOCK: &[u8] = b"clock";

/// Storage wrapper for RocksDB
pub struct Storage {
    db: Arc<DB>,
}

impl Storage {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        // Create directory if not exists
        std::fs::create_dir_all(path)?;

        // Database options
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        // Tuning from config
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_target_file_size_base(config.rocksdb.target_file_size_mb * 1024 * 1024);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);
        db_opts.set_level_zero_file_num_compaction_trigger(
            config.rocksdb.level0_file_num_compaction_trigger,
        );

        // Universal compaction for the append-heavy event log
        db_opts.set_compaction_style(DBCompactionStyle::Universal);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        // Column family descriptors
        let cf_descriptors = vec![
            ColumnFamilyDescriptor::new(CF_DELIVERIES, Self::cf_options_deliveries()),
            ColumnFamilyDescriptor::new(CF_EVENT_LOG, Self::cf_options_event_log()),
            ColumnFamilyDescriptor::new(CF_ROLES, Self::cf_options_roles()),
            ColumnFamilyDescriptor::new(CF_CONTROL, Self::cf_options_control()),
        ];

        // Open database
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!("Opened RocksDB at {:?}", path);

        Ok(Self { db: Arc::new(db) })
    }

    // Column family options

    fn cf_options_deliveries() -> Options {
        let mut opts = Options::default();
        // Records are frequently read, use LZ4 for speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_options_event_log() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
        opts.set_bottommost_compression_type(rocksdb::DBCompressionType::Zstd);
        opts
    }

    fn cf_options_roles() -> Options {
        let mut opts = Options::default();
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        // Point lookups on (user, delivery) keys benefit from bloom filters
        let mut block_opts = rocksdb::BlockBasedOptions::default();
        block_opts.set_bloom_filter(10.0, false);
        opts.set_block_based_table_factory(&block_opts);
        opts
    }

    fn cf_options_control() -> Options {
        Options::default()
    }

    // Helper: get column family handle

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    // Key encoding

    fn record_key(delivery_id: DeliveryId) -> [u8; 8] {
        delivery_id.value().to_be_bytes()
    }

    /// Composite key: 8-byte delivery id, then 4-byte sequence, both
    /// big-endian so entries of one delivery iterate in sequence order.
    fn event_key(delivery_id: DeliveryId, sequence: u32) -> [u8; 12] {
        let mut key = [0u8; 12];
        key[..8].copy_from_slice(&delivery_id.value().to_be_bytes());
        key[8..].copy_from_slice(&sequence.to_be_bytes());
        key
    }

    fn role_key(user: &UserId, delivery_id: DeliveryId) -> Vec<u8> {
        let mut key = user.as_str().as_bytes().to_vec();
        key.push(b'|'); // Separator
        key.extend_from_slice(&delivery_id.value().to_be_bytes());
        key
    }

    // Delivery record operations

    /// Get delivery record by ID
    pub fn get_record(&self, delivery_id: DeliveryId) -> Result<Option<DeliveryRecord>> {
        let cf = self.cf_handle(CF_DELIVERIES)?;

        match self.db.get_cf(cf, Self::record_key(delivery_id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Put delivery record (single-key, used by forced failure)
    pub fn put_record(&self, record: &DeliveryRecord) -> Result<()> {
        let cf = self.cf_handle(CF_DELIVERIES)?;
        let value = bincode::serialize(record)?;
        self.db.put_cf(cf, Self::record_key(record.delivery_id), &value)?;
        Ok(())
    }

    /// Create a delivery record together with its initial role grants and
    /// the clock value that stamped it. All writes commit atomically.
    pub fn create_delivery_atomic(
        &self,
        record: &DeliveryRecord,
        grants: &[(UserId, RoleSet)],
        clock: u64,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Record
        let cf_deliveries = self.cf_handle(CF_DELIVERIES)?;
        let record_value = bincode::serialize(record)?;
        batch.put_cf(cf_deliveries, Self::record_key(record.delivery_id), &record_value);

        // 2. Initial role grants
        let cf_roles = self.cf_handle(CF_ROLES)?;
        for (user, set) in grants {
            let key = Self::role_key(user, record.delivery_id);
            let value = bincode::serialize(set)?;
            batch.put_cf(cf_roles, &key, &value);
        }

        // 3. Clock
        let cf_control = self.cf_handle(CF_CONTROL)?;
        batch.put_cf(cf_control, KEY_CLOCK, clock.to_be_bytes());

        // Atomic commit
        self.db.write(batch)?;

        Ok(())
    }

    /// Append one event entry and the record update it implies, plus the
    /// clock value that stamped them. All writes commit atomically.
    pub fn append_event_atomic(
        &self,
        entry: &EventLogEntry,
        record: &DeliveryRecord,
        clock: u64,
    ) -> Result<()> {
        let mut batch = WriteBatch::default();

        // 1. Event entry
        let cf_events = self.cf_handle(CF_EVENT_LOG)?;
        let entry_key = Self::event_key(entry.delivery_id, entry.sequence);
        let entry_value = bincode::serialize(entry)?;
        batch.put_cf(cf_events, entry_key, &entry_value);

        // 2. Record
        let cf_deliveries = self.cf_handle(CF_DELIVERIES)?;
        let record_value = bincode::serialize(record)?;
        batch.put_cf(cf_deliveries, Self::record_key(record.delivery_id), &record_value);

        // 3. Clock
        let cf_control = self.cf_handle(CF_CONTROL)?;
        batch.put_cf(cf_control, KEY_CLOCK, clock.to_be_bytes());

        // Atomic commit
        self.db.write(batch)?;

        Ok(())
    }

    // Event log operations

    /// Get event entry by (delivery, sequence)
    pub fn get_event(&self, delivery_id: DeliveryId, sequence: u32) -> Result<Option<EventLogEntry>> {
        let cf = self.cf_handle(CF_EVENT_LOG)?;

        match self.db.get_cf(cf, Self::event_key(delivery_id, sequence))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    // Role grant operations

    /// Get role grant for (user, delivery)
    pub fn get_role_set(&self, user: &UserId, delivery_id: DeliveryId) -> Result<Option<RoleSet>> {
        let cf = self.cf_handle(CF_ROLES)?;

        match self.db.get_cf(cf, Self::role_key(user, delivery_id))? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Put role grant for (user, delivery)
    pub fn put_role_set(
        &self,
        user: &UserId,
        delivery_id: DeliveryId,
        set: &RoleSet,
    ) -> Result<()> {
        let cf = self.cf_handle(CF_ROLES)?;
        let value = bincode::serialize(set)?;
        self.db.put_cf(cf, Self::role_key(user, delivery_id), &value)?;
        Ok(())
    }

    // Control singletons

    /// Get admin state
    pub fn get_admin_state(&self) -> Result<Option<AdminState>> {
        let cf = self.cf_handle(CF_CONTROL)?;

        match self.db.get_cf(cf, KEY_ADMIN)? {
            Some(value) => Ok(Some(bincode::deserialize(&value)?)),
            None => Ok(None),
        }
    }

    /// Put admin state
    pub fn put_admin_state(&self, state: &AdminState) -> Result<()> {
        let cf = self.cf_handle(CF_CONTROL)?;
        let value = bincode::serialize(state)?;
        self.db.put_cf(cf, KEY_ADMIN, &value)?;
        Ok(())
    }

    /// Get oracle allowlist (empty when never written)
    pub fn get_oracles(&self) -> Result<Vec<UserId>> {
        let cf = self.cf_handle(CF_CONTROL)?;

        match self.db.get_cf(cf, KEY_ORACLES)? {
            Some(value) => Ok(bincode::deserialize(&value)?),
            None => Ok(Vec::new()),
        }
    }

    /// Put oracle allowlist
    pub fn put_oracles(&self, oracles: &[UserId]) -> Result<()> {
        let cf = self.cf_handle(CF_CONTROL)?;
        let value = bincode::serialize(oracles)?;
        self.db.put_cf(cf, KEY_ORACLES, &value)?;
        Ok(())
    }

    /// Get logical clock (0 when never written)
    pub fn get_clock(&self) -> Result<u64> {
        let cf = self.cf_handle(CF_CONTROL)?;

        match self.db.get_cf(cf, KEY_CLOCK)? {
            Some(value) => {
                let bytes: [u8; 8] = value
                    .as_slice()
                    .try_into()
                    .map_err(|_| Error::Storage("Malformed clock value".to_string()))?;
                Ok(u64::from_be_bytes(bytes))
            }
            None => Ok(0),
        }
    }

    // Statistics

    /// Get storage statistics
    pub fn get_stats(&self) -> Result<StorageStats> {
        let cf_deliveries = self.cf_handle(CF_DELIVERIES)?;
        let cf_events = self.cf_handle(CF_EVENT_LOG)?;

        Ok(StorageStats {
            total_deliveries: self.approximate_count(cf_deliveries)?,
            total_events: self.approximate_count(cf_events)?,
        })
    }

    fn approximate_count(&self, cf: &ColumnFamily) -> Result<u64> {
        // RocksDB property for approximate count
        let prop = self
            .db
            .property_int_value_cf(cf, "rocksdb.estimate-num-keys")?
            .unwrap_or(0);

        Ok(prop)
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

/// Storage statistics
#[derive(Debug, Clone)]
pub struct StorageStats {
    /// Approximate number of delivery records
    pub total_deliveries: u64,
    /// Approximate number of event entries
    pub total_events: u64,
}
