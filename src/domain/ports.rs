use super::verification::VerificationResponse;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Session-scoped durable key/value storage holding serialized booking data.
///
/// Synchronous on purpose: flow navigation reads through this port and
/// must never await.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: String) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
    /// All stored keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}

pub type KeyValueStoreRef = Arc<dyn KeyValueStore>;

/// The external endpoint that confirms (or rejects) a payment reference.
///
/// An `Err` is a transport-level failure and is treated as "not yet
/// confirmed" by the verification service.
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, reference: &str) -> Result<VerificationResponse>;
}

pub type PaymentVerifierRef = Arc<dyn PaymentVerifier>;
