#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tripflow::application::verification::VerificationCallbacks;
use tripflow::domain::ports::PaymentVerifier;
use tripflow::domain::verification::VerificationResponse;
use tripflow::error::{FlowError, Result};

/// One scripted reply of the mock endpoint.
#[derive(Clone)]
pub enum Reply {
    Pending,
    Success,
    Failure(&'static str),
    TransportError,
    /// Answer `Success` after sleeping.
    SlowSuccess(Duration),
}

/// Mock verification endpoint replaying a script, then repeating `fallback`.
pub struct ScriptedVerifier {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
}

impl ScriptedVerifier {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentVerifier for ScriptedVerifier {
    async fn verify(&self, reference: &str) -> Result<VerificationResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        match reply {
            Reply::Pending => Ok(VerificationResponse::Pending),
            Reply::Success => Ok(VerificationResponse::Success {
                result: json!({ "reference": reference }),
            }),
            Reply::Failure(message) => Ok(VerificationResponse::Failure {
                message: message.to_string(),
            }),
            Reply::TransportError => Err(FlowError::IoError(std::io::Error::other(
                "connection reset",
            ))),
            Reply::SlowSuccess(delay) => {
                tokio::time::sleep(delay).await;
                Ok(VerificationResponse::Success {
                    result: json!({ "reference": reference }),
                })
            }
        }
    }
}

/// Which callback fired, and for which session label.
#[derive(Debug, Clone, PartialEq)]
pub enum Fired {
    Success(&'static str),
    Failure(&'static str, String),
    Timeout(&'static str),
}

/// Callbacks that report into `tx`, tagged with `label`.
pub fn recording_callbacks(label: &'static str, tx: &mpsc::UnboundedSender<Fired>) -> VerificationCallbacks {
    let on_success = tx.clone();
    let on_failure = tx.clone();
    let on_timeout = tx.clone();
    VerificationCallbacks::new(
        move |_result| {
            let _ = on_success.send(Fired::Success(label));
        },
        move |message| {
            let _ = on_failure.send(Fired::Failure(label, message));
        },
        move || {
            let _ = on_timeout.send(Fired::Timeout(label));
        },
    )
}

/// Drains whatever has been recorded so far.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<Fired>) -> Vec<Fired> {
    let mut fired = Vec::new();
    while let Ok(event) = rx.try_recv() {
        fired.push(event);
    }
    fired
}
