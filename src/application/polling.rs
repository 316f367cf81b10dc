//! Per-session polling loop.
//!
//! Each live session owns one poller task. The poller fires a check at a
//! fixed cadence without waiting for earlier checks to return, and reports
//! every response (and the budget running out) back to the registry tagged
//! with the session's generation. The registry alone decides whether a
//! report still matters.

use crate::domain::ports::PaymentVerifierRef;
use crate::domain::verification::{VerificationOptions, VerificationResponse};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Shortest cadence a poller will tick at.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug)]
pub(crate) enum SessionEvent {
    Checked {
        reference: String,
        generation: u64,
        response: VerificationResponse,
    },
    Expired {
        reference: String,
        generation: u64,
    },
}

/// Runs until the timeout budget elapses or the task is aborted.
///
/// Aborting the poller drops its `JoinSet`, which aborts in-flight checks;
/// a check that already delivered its report is discarded by the registry
/// instead.
pub(crate) async fn poll_session(
    reference: String,
    generation: u64,
    options: VerificationOptions,
    verifier: PaymentVerifierRef,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);

    let mut ticker = tokio::time::interval(options.poll_interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut checks = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut deadline => {
                debug!(%reference, generation, "verification budget exhausted");
                let _ = events.send(SessionEvent::Expired { reference, generation });
                break;
            }
            _ = ticker.tick() => {
                while checks.try_join_next().is_some() {}

                let verifier = verifier.clone();
                let events = events.clone();
                let reference = reference.clone();
                checks.spawn(async move {
                    let response = match verifier.verify(&reference).await {
                        Ok(response) => response,
                        Err(e) => {
                            warn!(%reference, error = %e, "verification check failed, treating as pending");
                            VerificationResponse::Pending
                        }
                    };
                    let _ = events.send(SessionEvent::Checked { reference, generation, response });
                });
            }
        }
    }
}
