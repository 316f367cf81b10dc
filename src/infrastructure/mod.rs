//! Storage backends implementing the [`KeyValueStore`](crate::domain::ports::KeyValueStore) port.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
