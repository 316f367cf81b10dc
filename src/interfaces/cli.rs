use crate::application::booking_state::BookingStateStore;
use crate::application::navigator::FlowNavigator;
use crate::domain::ports::KeyValueStoreRef;
use crate::domain::route::classify_location;
use crate::domain::service::ServiceType;
use crate::error::{FlowError, Result};
use crate::infrastructure::in_memory::InMemoryKeyValueStore;
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect booking flows and their stored state", long_about = None)]
pub struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print `service,step,resource` for a location, or `none`
    Classify { location: String },
    /// List a service's steps as `index,step,progress`
    Steps { service: ServiceType },
    /// Store a JSON value under a service-namespaced key
    Store {
        service: ServiceType,
        key: String,
        value: String,
    },
    /// Print a stored value, or `none`
    Get { service: ServiceType, key: String },
    /// Remove every entry stored for a service
    Clear { service: ServiceType },
    /// Report whether a step has all the data it requires
    Check { service: ServiceType, step: String },
    /// Report whether `target` may be entered from `current`
    CanEnter {
        service: ServiceType,
        target: String,
        current: String,
    },
}

/// Opens the backend selected on the command line.
pub fn open_store(db_path: Option<&Path>) -> Result<KeyValueStoreRef> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = crate::infrastructure::rocksdb::RocksDbKeyValueStore::open(path)?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryKeyValueStore::new()))
        }
        None => Ok(Arc::new(InMemoryKeyValueStore::new())),
    }
}

/// Executes `command` against `store`, writing results to `out`.
pub fn run<W: Write>(command: Command, store: KeyValueStoreRef, out: &mut W) -> Result<()> {
    let navigator = FlowNavigator::new(BookingStateStore::new(store));
    let state = navigator.state();

    match command {
        Command::Classify { location } => match classify_location(&location) {
            Some(route) => writeln!(
                out,
                "{},{},{}",
                route.service,
                route.step,
                route.resource_id.as_deref().unwrap_or("-")
            )?,
            None => writeln!(out, "none")?,
        },
        Command::Steps { service } => {
            for (index, step) in service.step_graph().steps().iter().enumerate() {
                writeln!(
                    out,
                    "{},{},{}",
                    index,
                    step,
                    navigator.progress_percentage(*step, service)
                )?;
            }
        }
        Command::Store {
            service,
            key,
            value,
        } => {
            let value: Value = serde_json::from_str(&value)
                .map_err(|e| FlowError::InvalidArgument(format!("value is not JSON: {}", e)))?;
            state.store(service, &key, &value)?;
            writeln!(out, "stored {}:{}", service, key)?;
        }
        Command::Get { service, key } => match state.get_stored::<Value>(service, &key) {
            Some(value) => writeln!(out, "{}", value)?,
            None => writeln!(out, "none")?,
        },
        Command::Clear { service } => {
            let removed = state.clear(service)?;
            writeln!(out, "cleared {}", removed)?;
        }
        Command::Check { service, step } => {
            let step = navigator.resolve_step(service, &step);
            let missing = state.missing_keys(step, service);
            if missing.is_empty() {
                writeln!(out, "complete")?;
            } else {
                writeln!(out, "missing: {}", missing.join(","))?;
            }
        }
        Command::CanEnter {
            service,
            target,
            current,
        } => {
            let target = navigator.resolve_step(service, &target);
            let current = navigator.resolve_step(service, &current);
            let allowed = navigator.is_step_accessible(target, current, service);
            writeln!(out, "{}", if allowed { "yes" } else { "no" })?;
        }
    }

    Ok(())
}
