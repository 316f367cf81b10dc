use super::service::ServiceType;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Lifecycle of a verification session.
///
/// `Verifying` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verifying,
    Success,
    Failed,
    Timeout,
}

impl VerificationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationStatus::Verifying)
    }
}

/// What the verification endpoint said about a reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum VerificationResponse {
    Pending,
    Success {
        #[serde(default)]
        result: Value,
    },
    Failure {
        #[serde(default)]
        message: String,
    },
}

/// The single terminal result of a session.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Success(Value),
    Failed(String),
    Timeout,
}

impl VerificationOutcome {
    pub fn status(&self) -> VerificationStatus {
        match self {
            VerificationOutcome::Success(_) => VerificationStatus::Success,
            VerificationOutcome::Failed(_) => VerificationStatus::Failed,
            VerificationOutcome::Timeout => VerificationStatus::Timeout,
        }
    }
}

/// Handle used to stop or inspect a session. It is the payment reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VerificationId(String);

impl VerificationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for VerificationId {
    fn from(reference: &str) -> Self {
        Self(reference.to_string())
    }
}

impl From<String> for VerificationId {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl fmt::Display for VerificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Polling cadence and budget for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOptions {
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
}

impl Default for VerificationOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl VerificationOptions {
    pub fn from_millis(poll_interval_ms: u64, timeout_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Everything needed to start polling one payment reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub reference: String,
    pub service: ServiceType,
    pub booking_id: Option<String>,
    pub options: VerificationOptions,
}

impl VerificationRequest {
    pub fn new(reference: impl Into<String>, service: ServiceType) -> Self {
        Self {
            reference: reference.into(),
            service,
            booking_id: None,
            options: VerificationOptions::default(),
        }
    }

    pub fn with_booking_id(mut self, booking_id: impl Into<String>) -> Self {
        self.booking_id = Some(booking_id.into());
        self
    }

    pub fn with_options(mut self, options: VerificationOptions) -> Self {
        self.options = options;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_response_discriminator() {
        let pending: VerificationResponse = serde_json::from_value(json!({"status": "pending"})).unwrap();
        assert_eq!(pending, VerificationResponse::Pending);

        let success: VerificationResponse =
            serde_json::from_value(json!({"status": "success", "result": {"booking": "B-1"}})).unwrap();
        assert_eq!(
            success,
            VerificationResponse::Success {
                result: json!({"booking": "B-1"})
            }
        );

        let failure: VerificationResponse =
            serde_json::from_value(json!({"status": "failure", "message": "card declined"})).unwrap();
        assert_eq!(
            failure,
            VerificationResponse::Failure {
                message: "card declined".to_string()
            }
        );
    }

    #[test]
    fn test_options_default_and_millis_fields() {
        let defaults = VerificationOptions::default();
        assert_eq!(defaults.poll_interval, Duration::from_millis(3000));
        assert_eq!(defaults.timeout, Duration::from_millis(60_000));

        let parsed: VerificationOptions =
            serde_json::from_value(json!({"poll_interval_ms": 10, "timeout_ms": 50})).unwrap();
        assert_eq!(parsed, VerificationOptions::from_millis(10, 50));
    }

    #[test]
    fn test_only_verifying_is_non_terminal() {
        assert!(!VerificationStatus::Verifying.is_terminal());
        assert!(VerificationStatus::Success.is_terminal());
        assert!(VerificationStatus::Failed.is_terminal());
        assert!(VerificationStatus::Timeout.is_terminal());
    }
}
