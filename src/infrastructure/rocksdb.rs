use crate::domain::ports::KeyValueStore;
use crate::error::{FlowError, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;

/// Column Family holding serialized booking state.
pub const CF_BOOKING_STATE: &str = "booking_state";

/// A persistent key/value store backed by RocksDB.
///
/// All entries live in a single column family; keys are the namespaced
/// strings produced by the booking state store and values are JSON text.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbKeyValueStore {
    db: Arc<DB>,
}

impl RocksDbKeyValueStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the booking state column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf = ColumnFamilyDescriptor::new(CF_BOOKING_STATE, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf])?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(CF_BOOKING_STATE).ok_or_else(|| {
            FlowError::StorageError("Booking state column family not found".to_string())
        })
    }
}

impl KeyValueStore for RocksDbKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self.cf()?;
        let Some(bytes) = self.db.get_cf(cf, key.as_bytes())? else {
            return Ok(None);
        };
        let value = String::from_utf8(bytes).map_err(|e| {
            FlowError::StorageError(format!("Stored value for '{}' is not UTF-8: {}", key, e))
        })?;
        Ok(Some(value))
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        let cf = self.cf()?;
        self.db.put_cf(cf, key.as_bytes(), value.as_bytes())?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db.delete_cf(cf, key.as_bytes())?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let cf = self.cf()?;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix.as_bytes(), Direction::Forward));

        let mut keys = Vec::new();
        for item in iter {
            let (key, _value) = item?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }
}
