use crate::domain::ports::KeyValueStoreRef;
use crate::domain::requirements::required_keys;
use crate::domain::service::{BookingStep, ServiceType};
use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

/// Service-namespaced booking data collected across the steps of a flow.
///
/// Reads never fail: missing, unreadable or corrupt entries are reported as
/// absent. Writes surface backend and serialization errors. There is no
/// expiry; callers clear a namespace when a flow completes, restarts or is
/// abandoned.
#[derive(Clone)]
pub struct BookingStateStore {
    backend: KeyValueStoreRef,
}

impl BookingStateStore {
    pub fn new(backend: KeyValueStoreRef) -> Self {
        Self { backend }
    }

    fn namespace(service: ServiceType) -> String {
        format!("{}:", service.as_str())
    }

    fn namespaced_key(service: ServiceType, key: &str) -> String {
        format!("{}:{}", service.as_str(), key)
    }

    /// Persists `value` under `key`, overwriting any previous value.
    pub fn store<T: Serialize + ?Sized>(&self, service: ServiceType, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.backend
            .set(&Self::namespaced_key(service, key), serialized)?;
        debug!(service = %service, key, "stored booking data");
        Ok(())
    }

    /// Reads and deserializes `key`; `None` if missing or unreadable.
    pub fn get_stored<T: DeserializeOwned>(&self, service: ServiceType, key: &str) -> Option<T> {
        let raw = self.read_raw(service, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(service = %service, key, error = %e, "ignoring corrupt booking entry");
                None
            }
        }
    }

    fn read_raw(&self, service: ServiceType, key: &str) -> Option<String> {
        match self.backend.get(&Self::namespaced_key(service, key)) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(service = %service, key, error = %e, "booking state read failed");
                None
            }
        }
    }

    /// Keys required by `step` that are absent or structurally invalid.
    pub fn missing_keys(&self, step: BookingStep, service: ServiceType) -> Vec<&'static str> {
        required_keys(service, step)
            .iter()
            .filter(|required| {
                !self
                    .get_stored::<Value>(service, required.key)
                    .is_some_and(|value| required.is_satisfied_by(&value))
            })
            .map(|required| required.key)
            .collect()
    }

    /// True when every key `step` requires is present and valid.
    pub fn has_required_data_for_step(&self, step: BookingStep, service: ServiceType) -> bool {
        let missing = self.missing_keys(step, service);
        if !missing.is_empty() {
            debug!(service = %service, step = %step, ?missing, "step data incomplete");
        }
        missing.is_empty()
    }

    /// Removes every entry in `service`'s namespace and nothing else.
    ///
    /// Returns the number of entries removed.
    pub fn clear(&self, service: ServiceType) -> Result<usize> {
        let keys = self.backend.keys_with_prefix(&Self::namespace(service))?;
        for key in &keys {
            self.backend.remove(key)?;
        }
        debug!(service = %service, removed = keys.len(), "cleared booking data");
        Ok(keys.len())
    }

    /// Starts the flow over with new search criteria.
    ///
    /// The criteria are stored under the key the service's first step
    /// requires, after the namespace has been cleared.
    pub fn restart<T: Serialize + ?Sized>(&self, service: ServiceType, criteria: &T) -> Result<()> {
        self.clear(service)?;
        let first = service.step_graph().first();
        if let Some(required) = required_keys(service, first).first() {
            self.store(service, required.key, criteria)?;
        }
        Ok(())
    }
}
